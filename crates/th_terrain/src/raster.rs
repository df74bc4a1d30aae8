// crates/th_terrain/src/raster.rs

//! 栅格传输结构
//!
//! [`DemRaster`] 是 IO 层（GeoTIFF 驱动 / 文本解析器）与网格层之间的
//! 传输结构：按行主序平铺的高程值，附带可选的像元尺寸与无数据值。
//! 网格层据此决定分辨率采纳与无数据映射，见 [`crate::grid::TerrainGrid`]。

use th_foundation::{ThError, ThResult};

/// DEM 栅格数据
///
/// `data[i * ny + j]` 为第 `i` 行第 `j` 列的高程值 [m]。
#[derive(Debug, Clone)]
pub struct DemRaster {
    /// 高程数据（行主序平铺）
    pub data: Vec<f64>,
    /// 行数
    pub nx: usize,
    /// 列数
    pub ny: usize,
    /// 像元尺寸 (宽, 高) [m]，栅格源无地理变换时为 None
    pub pixel_size: Option<(f64, f64)>,
    /// 无数据值（栅格源未声明时为 None）
    pub nodata: Option<f64>,
}

impl DemRaster {
    /// 从平铺数据创建栅格
    ///
    /// # 参数
    ///
    /// - `data`: 行主序平铺的高程值，长度必须为 `nx * ny`
    /// - `nx`, `ny`: 行数与列数
    pub fn from_data(data: Vec<f64>, nx: usize, ny: usize) -> ThResult<Self> {
        ThError::check_size("raster data", nx * ny, data.len())?;
        Ok(Self {
            data,
            nx,
            ny,
            pixel_size: None,
            nodata: None,
        })
    }

    /// 设置像元尺寸
    pub fn with_pixel_size(mut self, width: f64, height: f64) -> Self {
        self.pixel_size = Some((width, height));
        self
    }

    /// 设置无数据值
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// 获取像素值
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.nx && j < self.ny {
            Some(self.data[i * self.ny + j])
        } else {
            None
        }
    }

    /// 判断某个值是否为无数据
    ///
    /// 与声明的无数据值按绝对容差 1e-6 比较（与栅格库的浮点无数据
    /// 语义保持一致）。
    #[inline]
    pub fn is_nodata(&self, value: f64) -> bool {
        match self.nodata {
            Some(nd) => value.is_nan() || (value - nd).abs() < 1e-6,
            None => value.is_nan(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_size_check() {
        let raster = DemRaster::from_data(vec![0.0; 6], 2, 3).unwrap();
        assert_eq!(raster.get(1, 2), Some(0.0));
        assert_eq!(raster.get(2, 0), None);

        let bad = DemRaster::from_data(vec![0.0; 5], 2, 3);
        assert!(bad.is_err());
    }

    #[test]
    fn test_is_nodata_tolerance() {
        let raster = DemRaster::from_data(vec![0.0; 4], 2, 2)
            .unwrap()
            .with_nodata(-9999.0);
        assert!(raster.is_nodata(-9999.0));
        assert!(raster.is_nodata(-9999.0 + 5e-7));
        assert!(!raster.is_nodata(-9998.0));
        assert!(raster.is_nodata(f64::NAN));
    }
}
