//! Deserialization of crawler output into contract types.

use diario_contract::{ContentType, GazetteEdition, RawContent};

const EDITION_JSON: &str = r#"{
    "metadata": {
        "edition_id": "5120",
        "publication_date": "2024-03-05",
        "edition_number": 312,
        "supplement": false,
        "edition_type_id": 1,
        "edition_type_name": "Ordinária",
        "pdf_url": "https://example.org/diario/5120.pdf"
    },
    "articles": [
        {
            "metadata": {
                "article_id": "5120-1",
                "edition_id": "5120",
                "title": "Decreto nº 1.234",
                "hierarchy_path": ["Poder Executivo", "Decretos"],
                "identifier": "1.234",
                "protocol": "P-77"
            },
            "content": {"raw_content": "Fica nomeado...", "content_type": "text"}
        },
        {
            "metadata": {"article_id": "5120-2", "edition_id": "5120"},
            "content": {"raw_content": [37, 80, 68, 70], "content_type": "pdf"}
        }
    ]
}"#;

#[test]
fn crawler_edition_deserializes() {
    let edition: GazetteEdition = serde_json::from_str(EDITION_JSON).unwrap();

    assert_eq!(edition.metadata.edition_id, "5120");
    assert_eq!(edition.metadata.edition_number, 312);
    assert_eq!(edition.article_count(), 2);

    let first = &edition.articles[0];
    assert_eq!(first.metadata.hierarchy_path.len(), 2);
    assert_eq!(
        first.content.raw_content,
        Some(RawContent::Text("Fica nomeado...".to_string()))
    );

    let second = &edition.articles[1];
    assert_eq!(second.content.content_type, ContentType::Pdf);
    assert_eq!(
        second.content.raw_content,
        Some(RawContent::Bytes(b"%PDF".to_vec()))
    );
}

#[test]
fn edition_without_articles_defaults_to_empty() {
    let json = r#"{"metadata": {"edition_id": "1", "publication_date": "2024-01-02"}}"#;
    let edition: GazetteEdition = serde_json::from_str(json).unwrap();
    assert_eq!(edition.article_count(), 0);
    assert!(!edition.metadata.supplement);
    assert_eq!(edition.metadata.pdf_url, "");
}
