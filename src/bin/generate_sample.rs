use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const ROWS: usize = 600;
const OUTPUT_DIR: &str = "data";

const LEVELS: [(&str, f64); 4] = [
    ("EN", 65_000.0),
    ("MI", 95_000.0),
    ("SE", 140_000.0),
    ("EX", 190_000.0),
];
const SIZES: [(&str, f64); 3] = [("S", 0.85), ("M", 1.0), ("L", 1.1)];
const TITLES: [(&str, f64); 12] = [
    ("Data Scientist", 1.0),
    ("Data Engineer", 1.0),
    ("Data Analyst", 0.75),
    ("Machine Learning Engineer", 1.15),
    ("Analytics Engineer", 0.95),
    ("Research Scientist", 1.1),
    ("Data Architect", 1.2),
    ("Applied Scientist", 1.15),
    ("BI Developer", 0.8),
    ("ML Ops Engineer", 1.05),
    ("Head of Data", 1.4),
    ("Data Manager", 1.05),
];
const JOB_TYPES: [&str; 3] = ["Remote", "Hybrid", "On-site"];
const EMPLOYMENT: [&str; 4] = ["FT", "FT", "FT", "CT"];
const LOCATIONS: [&str; 6] = ["US", "US", "GB", "DE", "CA", "IN"];

/// Box-Muller transform for a normal sample.
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// One synthetic salary record. `job_type` is occasionally missing.
struct Row {
    work_year: i64,
    experience_level: &'static str,
    employment_type: &'static str,
    job_title: &'static str,
    job_type: Option<&'static str>,
    salary_in_usd: i64,
    remote_ratio: i64,
    company_location: &'static str,
    company_size: &'static str,
}

fn generate(rng: &mut StdRng) -> Vec<Row> {
    (0..ROWS)
        .map(|_| {
            let (level, base) = LEVELS[rng.gen_range(0..LEVELS.len())];
            let (size, size_factor) = SIZES[rng.gen_range(0..SIZES.len())];
            // Earlier titles are more common.
            let title_idx = (rng.gen::<f64>().powi(2) * TITLES.len() as f64) as usize;
            let (title, title_factor) = TITLES[title_idx.min(TITLES.len() - 1)];
            let job_type = JOB_TYPES.choose(rng).copied().filter(|_| rng.gen::<f64>() > 0.03);
            let remote_ratio = match job_type {
                Some("Remote") => 100,
                Some("Hybrid") => 50,
                _ => 0,
            };
            let salary = gauss(rng, base * size_factor * title_factor, base * 0.15).max(15_000.0);

            Row {
                work_year: rng.gen_range(2020..=2023),
                experience_level: level,
                employment_type: EMPLOYMENT.choose(rng).copied().unwrap_or("FT"),
                job_title: title,
                job_type,
                salary_in_usd: (salary / 100.0).round() as i64 * 100,
                remote_ratio,
                company_location: LOCATIONS.choose(rng).copied().unwrap_or("US"),
                company_size: size,
            }
        })
        .collect()
}

const HEADER: [&str; 9] = [
    "work_year",
    "experience_level",
    "employment_type",
    "job_title",
    "job_type",
    "salary_in_usd",
    "remote_ratio",
    "company_location",
    "company_size",
];

fn write_csv(rows: &[Row], path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("cannot create {}", path.display()))?;
    writer.write_record(HEADER)?;
    for r in rows {
        writer.write_record([
            r.work_year.to_string(),
            r.experience_level.to_string(),
            r.employment_type.to_string(),
            r.job_title.to_string(),
            r.job_type.unwrap_or("").to_string(),
            r.salary_in_usd.to_string(),
            r.remote_ratio.to_string(),
            r.company_location.to_string(),
            r.company_size.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &Path) -> Result<()> {
    let text = |f: fn(&Row) -> &'static str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let int = |f: fn(&Row) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let columns: Vec<ArrayRef> = vec![
        int(|r| r.work_year),
        text(|r| r.experience_level),
        text(|r| r.employment_type),
        text(|r| r.job_title),
        Arc::new(StringArray::from(rows.iter().map(|r| r.job_type).collect::<Vec<_>>())),
        int(|r| r.salary_in_usd),
        int(|r| r.remote_ratio),
        text(|r| r.company_location),
        text(|r| r.company_size),
    ];

    let fields: Vec<Field> = HEADER
        .iter()
        .zip(&columns)
        .map(|(name, col)| Field::new(*name, col.data_type().clone(), *name == "job_type"))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let batch = RecordBatch::try_new(schema.clone(), columns).context("failed to build record batch")?;
    let file = std::fs::File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = StdRng::seed_from_u64(42);
    let rows = generate(&mut rng);

    let dir = Path::new(OUTPUT_DIR);
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let csv_path = dir.join("cleaned_data.csv");
    write_csv(&rows, &csv_path)?;
    let parquet_path = dir.join("cleaned_data.parquet");
    write_parquet(&rows, &parquet_path)?;

    println!(
        "Wrote {} salary records to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
