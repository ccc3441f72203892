//! End-to-end report generation over a CSV dataset and a two-sheet
//! template whose active "Card" sheet carries a logo.

mod common;

use common::{Fixture, ABC123, CATALOG_URL, LOGO, PEOPLE, XYZ9};
use sheetmill_core::{generate_report, render_report, ReportError};
use sheetmill_ooxml::{CellRef, OoxmlArchive, WorkbookPackage};

const CARD_JOB: &str = r#"
sheet_name_column = "Name"

[[fields]]
column = "Name"
cells = ["B1"]

[[fields]]
column = "Product"
cells = ["B2"]

[[fields]]
column = "Qty"
cells = ["D5"]

[split]
column = "Product"
method = "Remove Numbers"

[image]
key_column = "Code"
cells = ["C3"]
"#;

fn cell(reference: &str) -> CellRef {
    CellRef::parse(reference).unwrap()
}

#[test]
fn test_one_sheet_per_row() {
    let fixture = Fixture::new(PEOPLE);
    let summary = generate_report(&fixture.job(CARD_JOB)).unwrap();

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.sheets, vec!["Alice".to_string(), "Bob".to_string()]);
    assert_eq!(summary.images_placed, 2);
    assert_eq!(summary.images_missing, 0);

    let output = WorkbookPackage::open(fixture.output()).unwrap();
    let names: Vec<&str> = output.sheets().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob"]);

    let alice = output.worksheet(output.sheet("Alice").unwrap()).unwrap();
    assert_eq!(alice.cell_text(cell("B1")).as_deref(), Some("Alice"));
    assert_eq!(alice.cell_text(cell("B2")).as_deref(), Some("Widget"));
    assert_eq!(alice.cell(cell("B2")).and_then(|c| c.attr("s")), Some("1"));
    assert_eq!(alice.cell_text(cell("D5")).as_deref(), Some("2"));
    // Template text is kept
    assert_eq!(alice.cell_text(cell("A2")).as_deref(), Some("Product:"));

    let bob = output.worksheet(output.sheet("Bob").unwrap()).unwrap();
    assert_eq!(bob.cell_text(cell("B1")).as_deref(), Some("Bob"));
    assert_eq!(bob.cell_text(cell("D5")).as_deref(), Some("5"));
}

#[test]
fn test_images_and_logo_on_every_sheet() {
    let fixture = Fixture::new(PEOPLE);
    generate_report(&fixture.job(CARD_JOB)).unwrap();
    let output = WorkbookPackage::open(fixture.output()).unwrap();

    for (title, barcode) in [("Alice", ABC123), ("Bob", XYZ9)] {
        let pictures = output.pictures(output.sheet(title).unwrap()).unwrap();
        assert_eq!(pictures.len(), 2, "{title}");

        let generated = pictures
            .iter()
            .find(|p| p.anchor_kind() == "oneCellAnchor")
            .unwrap();
        assert_eq!(generated.anchor_cell(), Some(cell("C3")));
        assert_eq!(&generated.media.bytes[..], barcode);

        let logo = pictures.iter().find(|p| p.name() == Some("Logo")).unwrap();
        assert_eq!(logo.anchor_cell(), Some(cell("F1")));
        assert_eq!(&logo.media.bytes[..], LOGO);
    }
}

#[test]
fn test_image_centered_and_cells_grown() {
    let fixture = Fixture::new(PEOPLE);
    generate_report(&fixture.job(CARD_JOB)).unwrap();
    let output = WorkbookPackage::open(fixture.output()).unwrap();
    let alice = output.worksheet(output.sheet("Alice").unwrap()).unwrap();

    // Column C is 280 px wide, wider than the image: kept
    assert_eq!(alice.column_width_px(2), 280);
    // Row 3 is 20 px high: grown to the image height
    assert_eq!(alice.row_height_px(2), 60);
    // Neighbouring cells stay at the defaults
    assert_eq!(alice.column_width_px(1), 64);
    assert_eq!(alice.row_height_px(3), 20);

    // Centered across the 80 spare pixels of column C: 40 px = 381000 EMU
    let archive = OoxmlArchive::open(fixture.output()).unwrap();
    let drawings: Vec<String> = archive
        .file_list()
        .filter(|f| f.starts_with("xl/drawings/drawing") && f.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    assert_eq!(drawings.len(), 2);
    for part in drawings {
        let xml = archive.get_string(&part).unwrap().unwrap();
        assert!(xml.contains("<xdr:colOff>381000</xdr:colOff>"), "{part}");
    }
}

#[test]
fn test_value_and_image_reach_every_listed_cell() {
    let fixture = Fixture::new(PEOPLE);
    let toml = CARD_JOB
        .replace(r#"cells = ["B1"]"#, r#"cells = ["B1", "D4"]"#)
        .replace(r#"cells = ["C3"]"#, r#"cells = ["C3", "E7"]"#);
    let summary = generate_report(&fixture.job(&toml)).unwrap();
    assert_eq!(summary.images_placed, 2 * summary.rows);

    let output = WorkbookPackage::open(fixture.output()).unwrap();
    for title in ["Alice", "Bob"] {
        let sheet = output.worksheet(output.sheet(title).unwrap()).unwrap();
        assert_eq!(sheet.cell_text(cell("B1")).as_deref(), Some(title));
        assert_eq!(sheet.cell_text(cell("D4")).as_deref(), Some(title));

        let pictures = output.pictures(output.sheet(title).unwrap()).unwrap();
        let mut anchors: Vec<CellRef> = pictures
            .iter()
            .filter(|p| p.anchor_kind() == "oneCellAnchor")
            .filter_map(|p| p.anchor_cell())
            .collect();
        anchors.sort_by_key(|c| (c.row, c.col));
        assert_eq!(anchors, vec![cell("C3"), cell("E7")], "{title}");
        assert_eq!(pictures.len(), 3, "{title}");
    }
}

#[test]
fn test_external_hyperlinks_carried_to_every_sheet() {
    let fixture = Fixture::new(PEOPLE);
    generate_report(&fixture.job(CARD_JOB)).unwrap();

    let output = WorkbookPackage::open(fixture.output()).unwrap();
    let archive = OoxmlArchive::open(fixture.output()).unwrap();
    for title in ["Alice", "Bob"] {
        let part = &output.sheet(title).unwrap().part;
        let xml = archive.get_string(part).unwrap().unwrap();
        let rels = archive.relationships_of(part).unwrap();

        let (id, link) = rels
            .iter()
            .find(|(_, rel)| rel.target == CATALOG_URL)
            .unwrap();
        assert!(link.is_external(), "{title}");
        assert!(xml.contains(&format!(r#"<hyperlink ref="A1" r:id="{id}"/>"#)), "{title}");
    }
}

#[test]
fn test_narrow_column_is_widened() {
    let fixture = Fixture::new(PEOPLE);
    let job = fixture.job(&CARD_JOB.replace(r#"cells = ["C3"]"#, r#"cells = ["B5"]"#));
    generate_report(&job).unwrap();

    let output = WorkbookPackage::open(fixture.output()).unwrap();
    let bob = output.worksheet(output.sheet("Bob").unwrap()).unwrap();
    assert_eq!(bob.column_width_px(1), 200);
    assert_eq!(bob.row_height_px(4), 60);
    assert_eq!(bob.column_width_px(2), 280);
}

#[test]
fn test_template_sheets_not_in_output() {
    let fixture = Fixture::new(PEOPLE);
    generate_report(&fixture.job(CARD_JOB)).unwrap();

    let archive = OoxmlArchive::open(fixture.output()).unwrap();
    let workbook = archive.get_string("xl/workbook.xml").unwrap().unwrap();
    assert!(!workbook.contains(r#"name="Sheet1""#));
    assert!(!workbook.contains(r#"name="Card""#));

    let app = archive.get_string("docProps/app.xml").unwrap().unwrap();
    assert!(app.contains("<vt:lpstr>Alice</vt:lpstr>"));
    assert!(!app.contains("Card"));

    // Logo once, one file per barcode
    let media: Vec<&str> = archive
        .file_list()
        .filter(|f| f.starts_with("xl/media/"))
        .collect();
    assert_eq!(media.len(), 3);
}

#[test]
fn test_missing_image_is_skipped() {
    let fixture = Fixture::new("Name,Code,Product,Qty\nAlice,NOPE,Widget,1\n");
    let summary = generate_report(&fixture.job(CARD_JOB)).unwrap();
    assert_eq!(summary.images_placed, 0);
    assert_eq!(summary.images_missing, 1);

    let output = WorkbookPackage::open(fixture.output()).unwrap();
    let entry = output.sheet("Alice").unwrap();
    let pictures = output.pictures(entry).unwrap();
    assert_eq!(pictures.len(), 1);
    assert_eq!(pictures[0].name(), Some("Logo"));

    let alice = output.worksheet(entry).unwrap();
    assert_eq!(alice.cell_text(cell("B2")).as_deref(), Some("Widget"));
    assert_eq!(alice.row_height_px(2), 20);
}

#[test]
fn test_rows_without_title_merge_into_default() {
    let fixture = Fixture::new(PEOPLE);
    let job = fixture.job(&CARD_JOB.replace(r#"sheet_name_column = "Name""#, ""));
    let summary = generate_report(&job).unwrap();

    assert_eq!(summary.sheets, vec!["Default".to_string()]);
    assert_eq!(summary.reused_rows, 1);

    let output = WorkbookPackage::open(fixture.output()).unwrap();
    let entry = output.sheet("Default").unwrap();
    let sheet = output.worksheet(entry).unwrap();
    assert_eq!(sheet.cell_text(cell("B1")).as_deref(), Some("Bob"));

    // Both barcodes and the logo replayed once per row
    assert_eq!(output.pictures(entry).unwrap().len(), 4);
}

#[test]
fn test_titles_differing_in_case() {
    let fixture = Fixture::new("Name,Code,Product,Qty\nAlice,ABC123,A,1\nalice,XYZ9,B,2\nalice,XYZ9,C,3\n");
    let summary = generate_report(&fixture.job(CARD_JOB)).unwrap();
    assert_eq!(summary.sheets, vec!["Alice".to_string(), "alice1".to_string()]);

    let output = WorkbookPackage::open(fixture.output()).unwrap();
    let second = output.worksheet(output.sheet("alice1").unwrap()).unwrap();
    assert_eq!(second.cell_text(cell("B2")).as_deref(), Some("C"));
}

#[test]
fn test_render_without_writing() {
    let fixture = Fixture::new(PEOPLE);
    let (bytes, summary) = render_report(&fixture.job(CARD_JOB)).unwrap();
    assert_eq!(summary.sheets.len(), 2);
    assert!(!fixture.output().exists());
    assert_eq!(WorkbookPackage::from_bytes(&bytes).unwrap().sheets().len(), 2);
}

#[test]
fn test_summary_serializes() {
    let fixture = Fixture::new(PEOPLE);
    let summary = generate_report(&fixture.job(CARD_JOB)).unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["rows"], 2);
    assert_eq!(json["sheets"][1], "Bob");
    assert_eq!(json["images_missing"], 0);
}

#[test]
fn test_missing_data_is_load_error() {
    let fixture = Fixture::new(PEOPLE);
    let mut job = fixture.job(CARD_JOB);
    job.data = fixture.dir.path().join("absent.csv");
    assert!(matches!(generate_report(&job), Err(ReportError::Load(_))));
}

#[test]
fn test_broken_template_is_template_error() {
    let fixture = Fixture::new(PEOPLE);
    std::fs::write(&fixture.template, b"not a workbook").unwrap();
    assert!(matches!(
        generate_report(&fixture.job(CARD_JOB)),
        Err(ReportError::Template(_))
    ));
    assert!(!fixture.output().exists());
}

#[test]
fn test_empty_dataset_is_save_error() {
    let fixture = Fixture::new("Name,Code,Product,Qty\n");
    assert!(matches!(
        generate_report(&fixture.job(CARD_JOB)),
        Err(ReportError::Save(_))
    ));
    assert!(!fixture.output().exists());
}

#[test]
fn test_unwritable_output_is_save_error() {
    let fixture = Fixture::new(PEOPLE);
    let mut job = fixture.job(CARD_JOB);
    job.output = fixture.dir.path().join("missing").join("out.xlsx");
    assert!(matches!(generate_report(&job), Err(ReportError::Save(_))));
    assert!(!job.output.exists());
}
