//! Tests for the crawler configuration models.

use super::*;

fn sample_config() -> CrawlerConfig {
    CrawlerConfig {
        connection: ConnectionDescriptor::new(
            "jdbc:postgresql://db.example.com:5432/my_initial_database".to_string(),
            "admin".to_string(),
            "secret",
        ),
        targets: vec![ScanTarget::new(
            "postgres_connection",
            "my_initial_database/public/test_table",
        )],
        schema_hints: SchemaHints::new(vec![
            SchemaHint::new("id", "int"),
            SchemaHint::new("name", "string"),
            SchemaHint::new("age", "int"),
        ])
        .unwrap(),
    }
}

#[test]
fn test_configuration_json_shape() {
    let json = sample_config().to_configuration_json().unwrap();

    assert_eq!(
        json.as_str(),
        concat!(
            r#"{"JDBC_CONNECTION_URL":"jdbc:postgresql://db.example.com:5432/my_initial_database","#,
            r#""PASSWORD":"secret","USERNAME":"admin","#,
            r#""STORAGE_DESCRIPTOR":[{"COLUMN_NAME":"id","DATA_TYPE":"int"},"#,
            r#"{"COLUMN_NAME":"name","DATA_TYPE":"string"},"#,
            r#"{"COLUMN_NAME":"age","DATA_TYPE":"int"}]}"#
        )
    );
}

#[test]
fn test_configuration_json_is_deterministic() {
    let first = sample_config().to_configuration_json().unwrap();
    let second = sample_config().to_configuration_json().unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn test_redacted_configuration_hides_password() {
    let config = sample_config();
    let submission = CrawlerSubmission::new(
        "pocGlueCrawler".to_string(),
        "arn:aws:iam::123456789012:role/GlueCrawlerRole".to_string(),
        "postgres_glue_db".to_string(),
        config.targets.clone(),
        config.to_configuration_json().unwrap(),
    );

    let redacted = submission
        .redacted_configuration(&Redactor::new().with_secret("secret"))
        .unwrap();

    assert_eq!(redacted["PASSWORD"], REDACTED);
    assert_eq!(
        redacted["JDBC_CONNECTION_URL"],
        "jdbc:postgresql://db.example.com:5432/my_initial_database"
    );
    assert_eq!(redacted["STORAGE_DESCRIPTOR"][2]["COLUMN_NAME"], "age");
}

#[test]
fn test_redacted_configuration_masks_reused_password() {
    let config = CrawlerConfig {
        connection: ConnectionDescriptor::new(
            "jdbc:postgresql://db.example.com:5432/reused".to_string(),
            "reused".to_string(),
            "reused",
        ),
        ..sample_config()
    };
    let submission = CrawlerSubmission::new(
        "pocGlueCrawler".to_string(),
        "role".to_string(),
        "db".to_string(),
        config.targets.clone(),
        config.to_configuration_json().unwrap(),
    );

    let redacted = submission
        .redacted_configuration(&Redactor::new().with_secret("reused"))
        .unwrap();

    assert!(!redacted.to_string().contains("reused"));
    assert_eq!(redacted["USERNAME"], REDACTED);
}

#[test]
fn test_connection_descriptor_debug_redacted() {
    let config = sample_config();
    let debug = format!("{:?}", config);

    assert!(!debug.contains("\"secret\""));
    assert!(debug.contains("my_initial_database"));
}

#[test]
fn test_submission_debug_redacted() {
    let config = sample_config();
    let submission = CrawlerSubmission::new(
        "pocGlueCrawler".to_string(),
        "arn:aws:iam::123456789012:role/GlueCrawlerRole".to_string(),
        "postgres_glue_db".to_string(),
        config.targets.clone(),
        config.to_configuration_json().unwrap(),
    );

    let debug = format!("{:?}", submission);
    assert!(!debug.contains("secret\""));
    assert!(debug.contains("pocGlueCrawler"));
    assert!(submission.configuration_json().contains("\"PASSWORD\":\"secret\""));
}

#[test]
fn test_submission_same_content() {
    let config = sample_config();
    let make = |json: Zeroizing<String>| {
        CrawlerSubmission::new(
            "crawler".to_string(),
            "role".to_string(),
            "db".to_string(),
            config.targets.clone(),
            json,
        )
    };

    let a = make(config.to_configuration_json().unwrap());
    let b = make(config.to_configuration_json().unwrap());
    let c = make(Zeroizing::new("{}".to_string()));

    assert!(a.same_content_as(&b));
    assert!(!a.same_content_as(&c));
}

#[test]
fn test_schema_hints_reject_duplicates() {
    let result = SchemaHints::new(vec![
        SchemaHint::new("id", "int"),
        SchemaHint::new("id", "string"),
    ]);
    assert_eq!(
        result.unwrap_err(),
        SchemaHintError::DuplicateColumn("id".to_string())
    );
}

#[test]
fn test_schema_hints_reject_empty_values() {
    assert_eq!(
        SchemaHints::new(vec![SchemaHint::new(" ", "int")]).unwrap_err(),
        SchemaHintError::EmptyColumn
    );
    assert_eq!(
        SchemaHints::new(vec![SchemaHint::new("id", "")]).unwrap_err(),
        SchemaHintError::EmptyDataType("id".to_string())
    );
}

#[test]
fn test_schema_hints_deserialize_validates() {
    let ok: SchemaHints =
        serde_json::from_str(r#"[{"column_name":"id","data_type":"int"}]"#).unwrap();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok.iter().next().map(|hint| hint.data_type.as_str()), Some("int"));

    let duplicate = serde_json::from_str::<SchemaHints>(
        r#"[{"column_name":"id","data_type":"int"},{"column_name":"id","data_type":"int"}]"#,
    );
    assert!(duplicate.is_err());
}

#[test]
fn test_database_protocol_serde() {
    let protocol: DatabaseProtocol = serde_json::from_str("\"mysql\"").unwrap();
    assert_eq!(protocol, DatabaseProtocol::Mysql);
    assert_eq!(DatabaseProtocol::default().jdbc_subprotocol(), "postgresql");
    assert_eq!(DatabaseProtocol::Redshift.to_string(), "redshift");
}

#[test]
fn test_provisioning_outputs_names() {
    let outputs = ProvisioningOutputs {
        glue_database: "postgres_glue_db".to_string(),
        glue_crawler: "pocGlueCrawler".to_string(),
    };

    let json = serde_json::to_value(&outputs).unwrap();
    assert_eq!(json["GlueDatabaseOutput"], "postgres_glue_db");
    assert_eq!(json["GlueCrawlerOutput"], "pocGlueCrawler");
    assert_eq!(
        outputs.to_string(),
        "GlueDatabaseOutput = postgres_glue_db\nGlueCrawlerOutput = pocGlueCrawler"
    );
}

#[test]
fn test_submission_action_display() {
    assert_eq!(SubmissionAction::Created.to_string(), "created");
    assert_eq!(SubmissionAction::Unchanged.to_string(), "unchanged");
    let receipt = SubmissionReceipt::now("crawler", SubmissionAction::Updated);
    assert_eq!(receipt.crawler_name, "crawler");
}
