use serde::Deserialize;
use serde_value::Value;
use xml_arbor::tree::NamespaceMatch;
use xml_arbor::{Document, Reader, Writer};

use pretty_assertions::assert_eq;

fn written(doc: &Document) -> String {
    let mut writer = Writer::new(Vec::new());
    writer.serialize_document(doc).unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
}

#[test]
fn tree_survives_serde() {
    let xml = r#"<r xmlns="urn:r" xmlns:p="urn:p"><p:a k="v">text</p:a><b/></r>"#;
    let doc = Reader::new().parse_str(xml).unwrap();

    let value = serde_value::to_value(&doc).unwrap();
    let back = Document::deserialize(value).unwrap();

    assert_eq!(back, doc);
    assert_eq!(written(&back), xml);

    let r = back.root().unwrap();
    let a = back.child(r, "a", NamespaceMatch::Uri("urn:p"), 0).unwrap();
    assert_eq!(back.namespace(a), Some("urn:p"));
    assert_eq!(back.text(a, 0), Some("text"));
}

#[test]
fn node_ids_are_plain_numbers() {
    let doc = Reader::new().parse_str("<a><b/></a>").unwrap();
    let b = doc.children(doc.root().unwrap())[0];

    assert_eq!(
        serde_value::to_value(b).unwrap(),
        Value::Newtype(Box::new(Value::U64(b.index() as u64)))
    );
}
