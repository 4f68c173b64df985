use crate::xml::{CompleteMultipartUpload, CompletedPart, InitiateMultipartUploadResult};

#[test]
fn parses_upload_id_from_initiate_response() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult>
  <Bucket>media</Bucket>
  <Key>uploads/report.pdf</Key>
  <UploadId>2~abcDEF123</UploadId>
</InitiateMultipartUploadResult>"#;

    let upload_id = InitiateMultipartUploadResult::parse_upload_id(xml).unwrap();
    assert_eq!(upload_id, "2~abcDEF123");
}

#[test]
fn missing_upload_id_is_an_error() {
    let xml = r#"<InitiateMultipartUploadResult><Bucket>media</Bucket></InitiateMultipartUploadResult>"#;
    assert!(InitiateMultipartUploadResult::parse_upload_id(xml).is_err());

    let empty = r#"<InitiateMultipartUploadResult><UploadId></UploadId></InitiateMultipartUploadResult>"#;
    assert!(InitiateMultipartUploadResult::parse_upload_id(empty).is_err());
}

#[test]
fn complete_manifest_sorts_parts_ascending() {
    let manifest = CompleteMultipartUpload::new(vec![
        CompletedPart {
            part_number: 3,
            etag: "\"c\"".to_string(),
        },
        CompletedPart {
            part_number: 1,
            etag: "\"a\"".to_string(),
        },
        CompletedPart {
            part_number: 2,
            etag: "\"b\"".to_string(),
        },
    ]);

    let numbers: Vec<u32> = manifest.parts.iter().map(|p| p.part_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let xml = manifest.to_xml().unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    let first = xml.find("<PartNumber>1</PartNumber>").unwrap();
    let second = xml.find("<PartNumber>2</PartNumber>").unwrap();
    let third = xml.find("<PartNumber>3</PartNumber>").unwrap();
    assert!(first < second && second < third);
}

#[test]
fn completed_part_accepts_camel_case_aliases() {
    let part: CompletedPart =
        serde_json::from_str(r#"{"partNumber": 4, "etag": "\"abc\""}"#).unwrap();
    assert_eq!(part.part_number, 4);
    assert_eq!(part.etag, "\"abc\"");
}
