// crates/th_io/src/dem.rs

//! DEM 加载
//!
//! 按扩展名分派两条加载路径：
//! - `.csv` / `.txt`：分隔文本（逗号 / 分号 / 空白），一行一排
//! - `.tif` / `.tiff`：GeoTIFF 单波段栅格（需启用 `gdal` 特性）
//!
//! 两条路径统一产出 [`DemRaster`]；分辨率采纳与无数据映射由网格层
//! （[`th_terrain::TerrainGrid::from_raster`]）完成。

use crate::error::{IoError, IoResult};
use std::path::Path;
use th_foundation::ThError;
use th_terrain::DemRaster;

/// 按扩展名加载 DEM
///
/// # 错误
///
/// - 扩展名无法识别时返回 [`IoError::UnknownFormat`]
/// - GeoTIFF 路径在未启用 `gdal` 特性时返回
///   [`IoError::RasterDriverUnavailable`]
pub fn load_dem(path: &Path) -> IoResult<DemRaster> {
    let suffix = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    match suffix.as_str() {
        "csv" | "txt" => load_dem_text(path),
        "tif" | "tiff" => load_dem_geotiff(path),
        _ => Err(IoError::UnknownFormat {
            path: path.display().to_string(),
        }),
    }
}

// ============================================================
// 文本路径
// ============================================================

/// 从文本文件加载 DEM
///
/// 文件缺失映射为基础层的 [`ThError::FileNotFound`]，其余读取
/// 失败归入 [`IoError::LoadFailed`]。
pub fn load_dem_text(path: &Path) -> IoResult<DemRaster> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ThError::file_not_found(path).into());
        }
        Err(e) => {
            return Err(IoError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            });
        }
    };
    parse_dem_content(&content, &path.display().to_string())
}

/// 从字符串解析 DEM 文本
///
/// 行内按逗号、分号或空白分隔；空行跳过。行数为 `nx`，首行
/// 列数为 `ny`，各行列数必须一致。
pub fn parse_dem_text(content: &str) -> IoResult<DemRaster> {
    parse_dem_content(content, "<text>")
}

fn parse_dem_content(content: &str, label: &str) -> IoResult<DemRaster> {
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut row = Vec::new();
        for token in line
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let value: f64 = token.parse().map_err(|_| IoError::ParseError {
                file: label.to_string(),
                line: line_no + 1,
                message: format!("非法数字 '{}'", token),
            })?;
            row.push(value);
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(IoError::LoadFailed {
            path: label.to_string(),
            reason: "文件为空".to_string(),
        });
    }

    let nx = rows.len();
    let ny = rows[0].len();
    if ny == 0 {
        return Err(IoError::InvalidDimensions { nx, ny });
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != ny {
            return Err(IoError::ParseError {
                file: label.to_string(),
                line: i + 1,
                message: format!("列数不一致: 期望 {}, 实际 {}", ny, row.len()),
            });
        }
    }

    let data: Vec<f64> = rows.into_iter().flatten().collect();
    tracing::debug!("文本 DEM 解析完成: {} x {}", nx, ny);
    Ok(DemRaster::from_data(data, nx, ny)?)
}

// ============================================================
// GeoTIFF 路径
// ============================================================

/// 通过 GDAL 加载单波段 GeoTIFF
///
/// 逐行读取第 1 波段，任意一行失败即中止加载。地理变换存在时
/// 记录像元尺寸，无数据值透传给栅格结构。
#[cfg(feature = "gdal")]
pub fn load_dem_geotiff(path: &Path) -> IoResult<DemRaster> {
    let dataset = gdal::Dataset::open(path).map_err(|e| IoError::LoadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let (width, height) = dataset.raster_size();
    if width == 0 || height == 0 {
        return Err(IoError::InvalidDimensions {
            nx: height,
            ny: width,
        });
    }
    // nx 为行数（Y 尺寸），ny 为列数（X 尺寸）
    let nx = height;
    let ny = width;

    let band = dataset.rasterband(1).map_err(|e| IoError::LoadFailed {
        path: path.display().to_string(),
        reason: format!("波段 1 不可用: {}", e),
    })?;
    let nodata = band.no_data_value();

    let mut data = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        let row = band
            .read_as::<f64>((0, i as isize), (ny, 1), (ny, 1), None)
            .map_err(|e| IoError::RasterIo {
                row: i,
                message: e.to_string(),
            })?;
        data.extend_from_slice(&row.data);
    }

    let mut raster = DemRaster::from_data(data, nx, ny)?;
    if let Some(nd) = nodata {
        raster = raster.with_nodata(nd);
    } else {
        tracing::debug!("GeoTIFF 未声明无数据值");
    }
    match dataset.geo_transform() {
        Ok(gt) => {
            raster = raster.with_pixel_size(gt[1].abs(), gt[5].abs());
            tracing::debug!("地理变换像元尺寸: ({}, {})", gt[1].abs(), gt[5].abs());
        }
        Err(_) => {
            tracing::warn!("GeoTIFF 缺少地理变换，分辨率由调用方提供");
        }
    }

    tracing::info!("GeoTIFF 加载完成: {} x {}", nx, ny);
    Ok(raster)
}

/// gdal 特性未启用时的占位实现
#[cfg(not(feature = "gdal"))]
pub fn load_dem_geotiff(path: &Path) -> IoResult<DemRaster> {
    Err(IoError::RasterDriverUnavailable {
        path: path.display().to_string(),
    })
}

// ============================================================
// 测试
// ============================================================
