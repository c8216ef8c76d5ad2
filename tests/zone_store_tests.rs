mod common;

use common::{a_record, aaaa_record, basic_zone, fixture, ns, soa};
use std::fs;
use zonekeeper::{
    AdminError,
    zone::{RecordType, ResourceRecord, Zone},
};

#[test]
fn test_write_then_read_preserves_order() {
    let fx = fixture();
    let store = fx.service.store();

    let zone = basic_zone(
        "example.com",
        vec![
            a_record("www", "192.0.2.1", 300),
            ResourceRecord::new("@", RecordType::MX, 3600)
                .with_field("preference", "10")
                .with_field("exchange", "mail.example.com."),
            aaaa_record("www", "2001:db8::1", 300),
            a_record("mail", "192.0.2.2", 300),
            ResourceRecord::new("@", RecordType::TXT, 300)
                .with_field("text", "v=spf1 mx -all"),
            ResourceRecord::new("_sip._tcp", RecordType::SRV, 300)
                .with_field("priority", "10")
                .with_field("weight", "60")
                .with_field("port", "5060")
                .with_field("target", "sip.example.com."),
            ResourceRecord::new("ftp", RecordType::CNAME, 300).with_field("target", "www"),
            // Duplicate key stays
            a_record("www", "192.0.2.1", 300),
        ],
    );

    store.write_full(&zone).unwrap();
    let read = store.read("example.com").unwrap();

    let keys: Vec<(String, String)> = read
        .iter()
        .map(|r| (r.name.clone(), r.rtype.to_string()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("example.com.".to_string(), "SOA".to_string()),
            ("example.com.".to_string(), "NS".to_string()),
            ("www.example.com.".to_string(), "A".to_string()),
            ("example.com.".to_string(), "MX".to_string()),
            ("www.example.com.".to_string(), "AAAA".to_string()),
            ("mail.example.com.".to_string(), "A".to_string()),
            ("example.com.".to_string(), "TXT".to_string()),
            ("_sip._tcp.example.com.".to_string(), "SRV".to_string()),
            ("ftp.example.com.".to_string(), "CNAME".to_string()),
            ("www.example.com.".to_string(), "A".to_string()),
        ]
    );

    assert_eq!(read[3].field("exchange"), "mail.example.com.");
    assert_eq!(read[6].field("text"), "v=spf1 mx -all");
    assert_eq!(read[8].field("target"), "www.example.com.");
    assert_eq!(read[2].ttl, 300);
}

#[test]
fn test_file_layout() {
    let fx = fixture();
    let zone = Zone::new("example.com", Some(300), vec![a_record("www", "192.0.2.1", 300)]);

    fx.service.store().write_full(&zone).unwrap();

    let text = fx.read_zone_file("example.com");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "$ORIGIN example.com.");
    assert_eq!(lines[1], "$TTL 300");
    assert!(lines.contains(&"www 300 IN A 192.0.2.1"));
    assert_eq!(fx.service.store().read_raw("example.com").unwrap(), text);
}

#[test]
fn test_default_ttl_when_zone_has_none() {
    let fx = fixture();
    let zone = Zone::new("example.org", None, vec![soa("example.org")]);

    fx.service.store().write_full(&zone).unwrap();

    assert!(fx.read_zone_file("example.org").contains("$TTL 3600\n"));
    let read = fx.service.store().read_zone("example.org").unwrap();
    assert_eq!(read.ttl, Some(3600));
}

#[test]
fn test_checker_failure_restores_previous_bytes() {
    let fx = fixture();
    let store = fx.service.store();
    store
        .write_full(&basic_zone("example.com", vec![a_record("www", "192.0.2.1", 300)]))
        .unwrap();
    let before = fs::read(fx.zone_file("example.com")).unwrap();

    fx.runner.fail(
        "named-checkzone",
        "zone example.com/IN: loading from master file failed: bad dotted quad",
        "",
    );
    let err = store
        .write_full(&basic_zone("example.com", vec![a_record("www", "192.0.2.9", 60)]))
        .unwrap_err();

    assert!(matches!(err, AdminError::Syntax { .. }));
    assert_eq!(
        err.details(),
        Some("zone example.com/IN: loading from master file failed: bad dotted quad")
    );
    assert_eq!(fs::read(fx.zone_file("example.com")).unwrap(), before);
}

#[test]
fn test_checker_failure_removes_new_file() {
    let fx = fixture();
    fx.runner.fail("named-checkzone", "", "zone new.example/IN: has 0 SOA records");

    let err = fx
        .service
        .store()
        .write_full(&Zone::new("new.example", None, vec![a_record("www", "192.0.2.1", 300)]))
        .unwrap_err();

    assert_eq!(err.details(), Some("zone new.example/IN: has 0 SOA records"));
    assert!(!fx.zone_file("new.example").exists());
}

#[test]
fn test_incomplete_soa_is_syntax_error_and_file_unchanged() {
    let fx = fixture();
    let store = fx.service.store();
    store
        .write_full(&basic_zone("example.com", vec![]))
        .unwrap();
    let before = fs::read(fx.zone_file("example.com")).unwrap();
    fx.runner.reset();

    let mut broken = soa("example.com");
    broken.fields.remove("minttl");
    let err = store
        .write_full(&Zone::new("example.com", Some(3600), vec![broken]))
        .unwrap_err();

    assert!(matches!(err, AdminError::Syntax { .. }));
    assert!(!err.details().unwrap_or_default().is_empty());
    assert_eq!(fs::read(fx.zone_file("example.com")).unwrap(), before);
    // Re-parse failure stops before the external checker
    assert_eq!(fx.runner.count("named-checkzone"), 0);
}

#[test]
fn test_list_missing_directory_is_empty() {
    let fx = fixture();
    assert!(!fx.zone_dir().exists());
    assert!(fx.service.store().list().unwrap().is_empty());
}

#[test]
fn test_list_only_zone_files_sorted() {
    let fx = fixture();
    let dir = fx.zone_dir();
    fs::create_dir_all(dir.join("nested.zone")).unwrap();
    fs::write(dir.join("b.example.zone"), "").unwrap();
    fs::write(dir.join("a.example.zone"), "").unwrap();
    fs::write(dir.join("notes.txt"), "").unwrap();

    assert_eq!(
        fx.service.store().list().unwrap(),
        vec!["a.example".to_string(), "b.example".to_string()]
    );
}

#[test]
fn test_read_and_delete_missing_zone() {
    let fx = fixture();
    let store = fx.service.store();

    assert!(matches!(store.read("absent.example"), Err(AdminError::NotFound(_))));
    assert!(matches!(store.delete("absent.example"), Err(AdminError::NotFound(_))));
}

#[test]
fn test_read_malformed_zone_is_parse_error() {
    let fx = fixture();
    fs::create_dir_all(fx.zone_dir()).unwrap();
    fs::write(
        fx.zone_file("bad.example"),
        "$ORIGIN bad.example.\nwww 300 IN A 999.1.1.1\n",
    )
    .unwrap();

    let err = fx.service.store().read("bad.example").unwrap_err();
    assert!(matches!(err, AdminError::Parse(ref msg) if msg.contains("line 2")));
}

#[test]
fn test_write_raw_requires_existing_file() {
    let fx = fixture();
    let err = fx
        .service
        .store()
        .write_raw("absent.example", "$ORIGIN absent.example.\n")
        .unwrap_err();

    assert!(matches!(err, AdminError::NotFound(_)));
    assert!(!fx.zone_file("absent.example").exists());
}

#[test]
fn test_every_record_type_reads_back_unchanged() {
    let fx = fixture();
    let store = fx.service.store();

    // Absolute names throughout, the form reads return
    let mut apex_soa = soa("example.com");
    apex_soa.name = "example.com.".to_string();
    let mut apex_ns = ns("example.com");
    apex_ns.name = "example.com.".to_string();

    let records = vec![
        apex_soa,
        apex_ns,
        a_record("www.example.com.", "192.0.2.1", 300),
        aaaa_record("www.example.com.", "2001:db8::1", 300),
        ResourceRecord::new("ftp.example.com.", RecordType::CNAME, 600)
            .with_field("target", "www.example.com."),
        ResourceRecord::new("example.com.", RecordType::MX, 3600)
            .with_field("preference", "10")
            .with_field("exchange", "mail.example.com."),
        ResourceRecord::new("example.com.", RecordType::TXT, 300)
            .with_field("text", "say \"hi\" \\o/"),
        ResourceRecord::new("example.com.", RecordType::TXT, 300)
            .with_field("text", "v=spf1 mx -all"),
        ResourceRecord::new("_sip._tcp.example.com.", RecordType::SRV, 60)
            .with_field("priority", "10")
            .with_field("weight", "60")
            .with_field("port", "5060")
            .with_field("target", "sip.example.com."),
        ResourceRecord::new("1.example.com.", RecordType::PTR, 60)
            .with_field("ptr", "host.example.com."),
        ResourceRecord::new("example.com.", RecordType::from("CAA"), 300)
            .with_field("raw", "0 issue \"letsencrypt.org\""),
    ];
    store
        .write_full(&Zone::new("example.com", Some(3600), records.clone()))
        .unwrap();

    let read = store.read("example.com").unwrap();
    let key = |r: &ResourceRecord| (r.name.clone(), r.rtype.clone(), r.ttl, r.fields.clone());
    assert_eq!(
        read.iter().map(key).collect::<Vec<_>>(),
        records.iter().map(key).collect::<Vec<_>>()
    );
}

#[test]
fn test_unquoted_txt_survives_rewrite() {
    let fx = fixture();
    let store = fx.service.store();
    store.write_full(&basic_zone("example.com", vec![])).unwrap();
    store
        .write_raw(
            "example.com",
            "$ORIGIN example.com.\n$TTL 300\n@ 300 IN TXT v=spf1 -all\n",
        )
        .unwrap();

    let zone = store.read_zone("example.com").unwrap();
    store.write_full(&zone).unwrap();

    let read = store.read("example.com").unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].field("text"), "v=spf1 -all");
}

#[test]
fn test_multiline_field_fails_single_record_reparse() {
    let fx = fixture();
    let store = fx.service.store();
    store.write_full(&basic_zone("example.com", vec![])).unwrap();
    let before = fs::read(fx.zone_file("example.com")).unwrap();
    fx.runner.reset();

    let caa = ResourceRecord::new("@", RecordType::from("CAA"), 300)
        .with_field("raw", "0 issue \"ca.example\"\nevil 300 IN A 203.0.113.66");
    let err = store
        .write_full(&basic_zone("example.com", vec![caa]))
        .unwrap_err();

    assert!(matches!(err, AdminError::Syntax { .. }));
    assert_eq!(fs::read(fx.zone_file("example.com")).unwrap(), before);
    assert_eq!(fx.runner.count("named-checkzone"), 0);
}
