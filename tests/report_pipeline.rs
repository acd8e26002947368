use std::path::Path;

use salary_panda::charts::raster::{encode_png, RasterBackend};
use salary_panda::data::loader::{load_upload, parse_csv, Upload};
use salary_panda::report::{collect_pngs, export_eda_report, REPORT_FILE};

fn pdf_pages(path: &Path) -> usize {
    lopdf::Document::load(path).unwrap().get_pages().len()
}

#[test]
fn second_export_bundles_every_png_in_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let backend = RasterBackend::new(false);

    let first = parse_csv(b"salary_in_usd,experience_level\n100,SE\n80,MI\n").unwrap();
    let summary = export_eda_report(&first, dir.path(), &backend).unwrap();
    assert_eq!(summary.pages, 2);

    // A leftover from some other tool, upper-case extension.
    let stray = encode_png(4, 4, vec![255; 4 * 4 * 3]).unwrap();
    std::fs::write(dir.path().join("Extra.PNG"), stray.png).unwrap();

    let second = parse_csv(b"bonus,company_size\n5,L\n7,S\n").unwrap();
    let summary = export_eda_report(&second, dir.path(), &backend).unwrap();
    assert_eq!(summary.images.len(), 2);

    let pngs = collect_pngs(dir.path()).unwrap();
    assert_eq!(pngs.len(), 5);
    assert_eq!(summary.pages, pngs.len());
    assert_eq!(pdf_pages(&dir.path().join(REPORT_FILE)), pngs.len());
}

#[test]
fn downloaded_csv_parses_back_to_the_same_dataset() {
    let csv = "job_title,salary_in_usd,note\n\
               \"Data Scientist, Senior\",120000,\n\
               Data Engineer,95000,\"quoted \"\"text\"\"\"\n";
    let loaded = load_upload(Upload {
        name: "upload.csv".into(),
        bytes: csv.as_bytes().to_vec(),
    })
    .unwrap();

    let bytes = loaded.csv_bytes().unwrap();
    assert_eq!(parse_csv(&bytes).unwrap(), loaded.dataset);
}
