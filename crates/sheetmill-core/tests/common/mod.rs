//! Shared fixtures: a template workbook, a CSV dataset and an image folder
//! written into one temporary directory.

use std::path::PathBuf;

use sheetmill_core::{ReportJob, Settings};
use sheetmill_ooxml::OoxmlArchive;
use tempfile::TempDir;

pub const LOGO: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, b'L', b'O', b'G', b'O'];
pub const ABC123: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, b'A', b'B', b'C'];
pub const XYZ9: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, b'X', b'Y', b'Z'];

pub const CATALOG_URL: &str = "https://example.com/catalog";

pub const PEOPLE: &str = "Name,Code,Product,Qty\nAlice,ABC123,123 Widget,2\nBob,XYZ9,Gadget,5\n";

const CARD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheetViews><sheetView tabSelected="1" workbookViewId="0"/></sheetViews>
<sheetFormatPr defaultRowHeight="15"/>
<cols><col min="3" max="3" width="40" customWidth="1"/></cols>
<sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Name:</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Product:</t></is></c><c r="B2" s="1"/></row>
</sheetData>
<mergeCells count="1"><mergeCell ref="D1:E1"/></mergeCells>
<hyperlinks><hyperlink ref="A1" r:id="rId2"/></hyperlinks>
<drawing r:id="rId1"/>
</worksheet>"#;

fn template_bytes() -> Vec<u8> {
    let mut archive = OoxmlArchive::new();
    archive.set_string(
        "[Content_Types].xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/drawings/drawing1.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#,
    );
    archive.set_string(
        "_rels/.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#,
    );
    archive.set_string(
        "docProps/app.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>Microsoft Excel</Application></Properties>"#,
    );
    archive.set_string(
        "xl/workbook.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<bookViews><workbookView activeTab="1"/></bookViews>
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/><sheet name="Card" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#,
    );
    archive.set_string(
        "xl/_rels/workbook.xml.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#,
    );
    archive.set_string(
        "xl/styles.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellXfs></styleSheet>"#,
    );
    archive.set_string(
        "xl/worksheets/sheet1.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#,
    );
    archive.set_string("xl/worksheets/sheet2.xml", CARD);
    archive.set_string(
        "xl/worksheets/_rels/sheet2.xml.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/catalog" TargetMode="External"/>
</Relationships>"#,
    );
    archive.set_string(
        "xl/drawings/drawing1.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><xdr:twoCellAnchor editAs="oneCell"><xdr:from><xdr:col>5</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>0</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from><xdr:to><xdr:col>7</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>3</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to><xdr:pic><xdr:nvPicPr><xdr:cNvPr id="2" name="Logo"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" r:embed="rId1"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr/></xdr:pic><xdr:clientData/></xdr:twoCellAnchor></xdr:wsDr>"#,
    );
    archive.set_string(
        "xl/drawings/_rels/drawing1.xml.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
</Relationships>"#,
    );
    archive.set("xl/media/image1.png", LOGO.to_vec());
    archive.to_bytes().unwrap()
}

/// Files for one report run
pub struct Fixture {
    pub dir: TempDir,
    pub data: PathBuf,
    pub template: PathBuf,
    pub images: PathBuf,
}

impl Fixture {
    pub fn new(csv: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("before.csv");
        std::fs::write(&data, csv).unwrap();

        let template = dir.path().join("template.xlsx");
        std::fs::write(&template, template_bytes()).unwrap();

        let images = dir.path().join("barcodes");
        std::fs::create_dir(&images).unwrap();
        std::fs::write(images.join("ABC123.png"), ABC123).unwrap();
        std::fs::write(images.join("XYZ9.jpg"), XYZ9).unwrap();

        Self {
            dir,
            data,
            template,
            images,
        }
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("processed_excel.xlsx")
    }

    /// A job from TOML settings, with the image directory pointed at the fixture's
    pub fn job(&self, toml: &str) -> ReportJob {
        let mut settings = Settings::from_toml_str(toml).unwrap();
        if let Some(image) = settings.image.as_mut() {
            image.directory = self.images.clone();
        }
        ReportJob {
            data: self.data.clone(),
            template: self.template.clone(),
            output: self.output(),
            config: settings.into_config().unwrap(),
        }
    }
}
