// crates/th_io/src/results.rs

//! 结果报告导出
//!
//! 分节文本报告：参数节、降雨节（常量或日程）、总排水量节、
//! 累计时间序列节、逐出水口节（按排水体积降序，零体积省略）。
//! `.csv` 目标用逗号分隔并带表头行，其余用制表符。

use crate::error::{IoError, IoResult};
use std::io::Write;
use std::path::Path;

/// 降雨模式（用于报告）
#[derive(Debug, Clone, Copy)]
pub enum RainfallMode<'a> {
    /// 常量强度 [m/s]
    Constant(f64),
    /// 时变日程 (时间 [s], 强度 [m/s])
    TimeVarying(&'a [(f64, f64)]),
}

/// 模拟结果报告
#[derive(Debug, Clone)]
pub struct SimulationReport<'a> {
    /// 模拟总时长 [s]
    pub total_time: f64,
    /// 像元边长 [m]
    pub resolution: f64,
    /// Manning 糙率系数
    pub n_manning: f64,
    /// 入渗速率 [m/s]
    pub infiltration: f64,
    /// 干湿阈值水深 [m]
    pub min_depth: f64,
    /// 降雨模式
    pub rainfall: RainfallMode<'a>,
    /// 全局累计排水体积 [m³]
    pub total_drainage: f64,
    /// 累计时间序列 (t [s], V [m³])
    pub time_series: &'a [(f64, f64)],
    /// 逐出水口体积 ((行, 列), V [m³])，应已按体积降序
    pub per_outlet: &'a [((usize, usize), f64)],
}

/// 将报告写入任意 writer
///
/// # 参数
///
/// - `csv`: true 用逗号分隔并输出表头行，false 用制表符
pub fn write_report<W: Write>(w: &mut W, report: &SimulationReport<'_>, csv: bool) -> std::io::Result<()> {
    let sep = if csv { "," } else { "\t" };

    writeln!(w, "# SIMULATION PARAMETERS")?;
    if csv {
        writeln!(w, "Parameter{sep}Value{sep}Unit")?;
    }
    writeln!(w, "Simulation Time{sep}{}{sep}seconds", report.total_time)?;
    writeln!(w, "Cell Resolution{sep}{}{sep}m", report.resolution)?;
    writeln!(w, "Manning's Coefficient{sep}{}{sep}", report.n_manning)?;
    writeln!(w, "Infiltration Rate{sep}{}{sep}m/s", report.infiltration)?;
    writeln!(w, "Min Water Depth Threshold{sep}{}{sep}m", report.min_depth)?;

    match report.rainfall {
        RainfallMode::Constant(rate) => {
            writeln!(w, "Rainfall Mode{sep}Constant{sep}")?;
            writeln!(w, "Rainfall Rate{sep}{}{sep}m/s", rate)?;
        }
        RainfallMode::TimeVarying(schedule) => {
            writeln!(w, "Rainfall Mode{sep}Time-varying{sep}")?;
            writeln!(w)?;
            writeln!(w, "# RAINFALL SCHEDULE")?;
            if csv {
                writeln!(w, "Time (s){sep}Rainfall Rate (m/s)")?;
            }
            for &(t, rate) in schedule {
                writeln!(w, "{}{sep}{}", t, rate)?;
            }
        }
    }

    writeln!(w)?;
    writeln!(w, "# TOTAL DRAINAGE VOLUME")?;
    if csv {
        writeln!(w, "Total Drainage (m³)")?;
    }
    writeln!(w, "{}", report.total_drainage)?;

    writeln!(w)?;
    writeln!(w, "# TIME SERIES DATA")?;
    if csv {
        writeln!(w, "Time (s){sep}Cumulative Drainage (m³)")?;
    }
    for &(t, v) in report.time_series {
        writeln!(w, "{}{sep}{}", t, v)?;
    }

    writeln!(w)?;
    writeln!(w, "# PER-OUTLET DRAINAGE DATA")?;
    if csv {
        writeln!(w, "Row (i){sep}Column (j){sep}Drainage Volume (m³)")?;
    }
    for &((i, j), v) in report.per_outlet {
        if v > 0.0 {
            writeln!(w, "{}{sep}{}{sep}{}", i, j, v)?;
        }
    }

    Ok(())
}

/// 保存报告到文件，按扩展名选择分隔格式
pub fn save_report(path: &Path, report: &SimulationReport<'_>) -> IoResult<()> {
    let csv = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let write_err = |e: std::io::Error| IoError::WriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    let file = std::fs::File::create(path).map_err(write_err)?;
    let mut writer = std::io::BufWriter::new(file);
    write_report(&mut writer, report, csv).map_err(write_err)?;
    writer.flush().map_err(write_err)?;

    tracing::info!("结果已保存: {}", path.display());
    Ok(())
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report<'a>(
        series: &'a [(f64, f64)],
        per_outlet: &'a [((usize, usize), f64)],
    ) -> SimulationReport<'a> {
        SimulationReport {
            total_time: 1800.0,
            resolution: 0.25,
            n_manning: 0.03,
            infiltration: 1e-6,
            min_depth: 1e-5,
            rainfall: RainfallMode::Constant(1e-5),
            total_drainage: 12.5,
            time_series: series,
            per_outlet,
        }
    }

    #[test]
    fn test_csv_report_sections() {
        let series = vec![(0.0, 0.0), (1.0, 0.5), (2.0, 12.5)];
        let per_outlet = vec![((9, 3), 8.0), ((9, 4), 4.5)];
        let report = sample_report(&series, &per_outlet);

        let mut buf = Vec::new();
        write_report(&mut buf, &report, true).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("# SIMULATION PARAMETERS"));
        assert!(text.contains("Parameter,Value,Unit"));
        assert!(text.contains("Rainfall Mode,Constant,"));
        assert!(text.contains("# TOTAL DRAINAGE VOLUME"));
        assert!(text.contains("# TIME SERIES DATA"));
        assert!(text.contains("2,12.5"));
        assert!(text.contains("# PER-OUTLET DRAINAGE DATA"));
        assert!(text.contains("9,3,8"));
    }

    #[test]
    fn test_tab_report_no_headers() {
        let series = vec![(0.0, 0.0)];
        let per_outlet = vec![];
        let report = sample_report(&series, &per_outlet);

        let mut buf = Vec::new();
        write_report(&mut buf, &report, false).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(!text.contains("Parameter,Value,Unit"));
        assert!(text.contains("Simulation Time\t1800\tseconds"));
    }

    #[test]
    fn test_schedule_section_when_time_varying() {
        let series = vec![(0.0, 0.0)];
        let per_outlet = vec![];
        let schedule = vec![(0.0, 0.0), (60.0, 1e-5)];
        let mut report = sample_report(&series, &per_outlet);
        report.rainfall = RainfallMode::TimeVarying(&schedule);

        let mut buf = Vec::new();
        write_report(&mut buf, &report, true).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Rainfall Mode,Time-varying,"));
        assert!(text.contains("# RAINFALL SCHEDULE"));
        assert!(text.contains("60,0.00001"));
    }

    #[test]
    fn test_zero_volume_outlets_omitted() {
        let series = vec![(0.0, 0.0)];
        let per_outlet = vec![((0, 0), 5.0), ((0, 1), 0.0)];
        let report = sample_report(&series, &per_outlet);

        let mut buf = Vec::new();
        write_report(&mut buf, &report, true).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("0,0,5"));
        assert!(!text.contains("0,1,0\n"));
    }
}
