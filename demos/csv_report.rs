use chrono::Local;
use sales_kpi_report::*;
use std::error::Error;

const SAMPLE_CSV: &str = "\
Ngày,Mã sản phẩm,Doanh thu,Lợi nhuận
05/01/2024,SP-01,\"12,500,000\",\"1,800,000\"
20/01/2024,SP-02,\"4,000,000\",\"300,000\"
14/02/2024,SP-01,\"9,000,000\",\"1,200,000\"
03/03/2024,SP-03,\"15,000,000\",\"2,600,000\"
18/03/2024,SP-02,\"6,500,000\",\"700,000\"
";

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let processor = SalesReportProcessor::new(ReportConfig {
        date_order: DateOrder::DayFirst,
        ..ReportConfig::default()
    })?;

    let report = match std::env::args().nth(1) {
        Some(path) => {
            println!("📂 Reading sales export from {}\n", path);
            let table = read_csv_file(&path, &CsvOptions::default())?;
            processor.process(&table)?
        }
        None => {
            println!("📂 No path given, using the built-in sample\n");
            processor.process_csv(SAMPLE_CSV.as_bytes(), &CsvOptions::default())?
        }
    };

    println!(
        "✅ Kept {} of {} rows ({} without a valid date)\n",
        report.stats.kept_rows, report.stats.input_rows, report.stats.dropped_invalid_date
    );

    for line in &report.narrative {
        println!("{}", line);
    }

    let run_id = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let document = processor.document(&report, Local::now().naive_local(), &run_id);

    println!("\n📊 Charts for this run:");
    for chart in &document.charts {
        println!("   {} -> {}", chart.title, chart.file_name);
    }

    println!("\n📄 CSV export:\n{}", document.to_csv()?);
    Ok(())
}
