use std::fs;
use std::path::{Path, PathBuf};

use dstext_data::{DialogueDatabase, START_ENTRY_ID, validate_database};
use dstext_script::config::ImportOptions;
use dstext_script::{DiagnosticKind, Severity, collect_script_files, import_batch};

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dirs");
    }
    fs::write(&path, text).expect("write script");
    path
}

#[test]
fn forward_title_link_across_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    // name order puts the caller before the file that defines "Hub"
    write(dir.path(), "a_caller.dstext", "title: Caller\nnpc: Guard\nGuard: To the hub.\n\t<<link Hub>>\n\tGo ->\n");
    write(dir.path(), "b_hub.dstext", "title: Square\nnpc: Crier\n<<title Hub>>\nCrier: Welcome to the square!\n");

    let mut db = DialogueDatabase::new();
    let report = import_batch(&mut db, &[dir.path().to_path_buf()], &ImportOptions::default());

    assert_eq!(report.imported.len(), 2);
    assert_eq!(report.links_resolved, 1);
    assert!(!report.has_errors(), "{:?}", report.diagnostics);

    let square = db.conversation_by_title("Square").expect("square");
    let hub = square.entry_by_title("Hub").expect("hub entry");
    let caller = db.conversation_by_title("Caller").expect("caller");
    let go = caller.entry(3).expect("reply entry");
    assert_eq!(go.text, "Go");
    assert!(go.links_to(square.id, hub.id));
    assert!(validate_database(&db).is_empty());
}

#[test]
fn forward_title_link_in_either_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let hub = write(dir.path(), "hub.dstext", "title: Square\n<<title Hub>>\nCrier: Welcome!\n");
    let caller = write(dir.path(), "caller.dstext", "title: Caller\n<<link Hub>>\nGuard: Off you go.\n");

    for inputs in [[hub.clone(), caller.clone()], [caller.clone(), hub.clone()]] {
        let mut db = DialogueDatabase::new();
        let report = import_batch(&mut db, &inputs, &ImportOptions::default());
        assert_eq!(report.links_resolved, 1);
        let square = db.conversation_by_title("Square").expect("square");
        let origin = db.conversation_by_title("Caller").and_then(|c| c.entry(1)).expect("origin");
        assert!(origin.links_to(square.id, 1));
    }
}

#[test]
fn reimport_keeps_conversation_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let other = write(dir.path(), "other.dstext", "title: Other\nA: first\n");
    let gate = write(dir.path(), "gate.dstext", "title: Gate\nnpc: Guard\nGuard: Halt!\n");

    let mut db = DialogueDatabase::new();
    import_batch(&mut db, &[other.clone(), gate.clone()], &ImportOptions::default());
    let gate_id = db.conversation_by_title("Gate").expect("gate").id;

    fs::write(&gate, "title: Gate\nnpc: Guard\nGuard: Halt!\n\tYield ->\n").expect("rewrite");
    let report = import_batch(&mut db, &[gate], &ImportOptions::default());

    assert!(report.imported[0].replaced);
    assert_eq!(db.conversations.len(), 2);
    let convo = db.conversation_by_title("Gate").expect("gate");
    assert_eq!(convo.id, gate_id);
    assert_eq!(convo.entries.len(), 3);
    assert_eq!(db.actors.iter().filter(|a| a.name == "Guard").count(), 1);
}

#[test]
fn directory_scan_is_recursive_and_filtered() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "town/inn.dstext", "title: Inn\nKeeper: Room?\n");
    write(dir.path(), "town/market/stall.DSTEXT", "title: Stall\nMerchant: Buy something!\n");
    write(dir.path(), "notes.txt", "title: Notes\nNobody: not a script\n");
    write(dir.path(), "gate.dstext", "title: Gate\nGuard: Halt!\n");

    let scan = collect_script_files(dir.path(), "dstext");
    assert!(scan.errors.is_empty());
    let names: Vec<_> = scan
        .files
        .iter()
        .filter_map(|f| f.file_name().and_then(|n| n.to_str()))
        .collect();
    assert_eq!(names, vec!["gate.dstext", "inn.dstext", "stall.DSTEXT"]);

    let mut db = DialogueDatabase::new();
    let report = import_batch(&mut db, &[dir.path().to_path_buf()], &ImportOptions::default());
    assert_eq!(report.imported.len(), 3);
    assert!(db.conversation_by_title("Notes").is_none());
}

#[test]
fn custom_extension_from_options() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "gate.dlg", "title: Gate\nGuard: Halt!\n");
    write(dir.path(), "inn.dstext", "title: Inn\nKeeper: Room?\n");

    let options = ImportOptions {
        extension: "dlg".into(),
        ..ImportOptions::default()
    };
    let mut db = DialogueDatabase::new();
    let report = import_batch(&mut db, &[dir.path().to_path_buf()], &options);
    assert_eq!(report.imported.len(), 1);
    assert_eq!(report.imported[0].title, "Gate");
}

#[test]
fn malformed_file_is_skipped_and_batch_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bad = write(dir.path(), "a_bad.dstext", "Guard: I have no title\n");
    write(dir.path(), "b_good.dstext", "title: Good\nGuard: Halt!\n<<script Alarm()\n");
    write(dir.path(), "c_fine.dstext", "title: Fine\nGuard: Carry on.\n");

    let mut db = DialogueDatabase::new();
    let report = import_batch(&mut db, &[dir.path().to_path_buf()], &ImportOptions::default());

    assert_eq!(report.skipped, vec![bad.clone()]);
    assert_eq!(
        report.imported.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(),
        vec!["Good", "Fine"]
    );
    let errors: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].file.as_deref(), Some(bad.as_path()));
    assert!(matches!(errors[1].kind, DiagnosticKind::MalformedDirective(_)));
    assert_eq!(db.conversations.len(), 2);
}

#[cfg(unix)]
#[test]
fn unreadable_entry_does_not_drop_the_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a_gate.dstext", "title: Gate\nGuard: Halt!\n");
    let dangling = dir.path().join("b_lost.dstext");
    std::os::unix::fs::symlink(dir.path().join("nowhere.dstext"), &dangling).expect("symlink");
    write(dir.path(), "c_inn.dstext", "title: Inn\nKeeper: Room?\n");

    let scan = collect_script_files(dir.path(), "dstext");
    assert_eq!(scan.files.len(), 2);
    assert_eq!(scan.errors.len(), 1);

    let mut db = DialogueDatabase::new();
    let report = import_batch(&mut db, &[dir.path().to_path_buf()], &ImportOptions::default());
    assert_eq!(
        report.imported.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(),
        vec!["Gate", "Inn"]
    );
    assert_eq!(report.skipped, vec![dangling.clone()]);
    assert_eq!(report.count(Severity::Error), 1);
    assert!(matches!(report.diagnostics[0].kind, DiagnosticKind::Io(_)));
    assert_eq!(report.diagnostics[0].file.as_deref(), Some(dangling.as_path()));
}

#[test]
fn byte_order_mark_file_imports() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write(dir.path(), "gate.dstext", "\u{feff}title: Gate\nnpc: Guard\nGuard: Halt!\n");

    let mut db = DialogueDatabase::new();
    let report = import_batch(&mut db, &[path], &ImportOptions::default());
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    let convo = db.conversation_by_title("Gate").expect("gate");
    assert_eq!(convo.entry(2).expect("guard line").text, "Halt!");
}

#[test]
fn missing_input_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.dstext");
    let mut db = DialogueDatabase::new();
    let report = import_batch(&mut db, &[missing.clone()], &ImportOptions::default());
    assert_eq!(report.skipped, vec![missing]);
    assert!(matches!(report.diagnostics[0].kind, DiagnosticKind::Io(_)));
}

#[test]
fn every_conversation_has_one_start_entry() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "one.dstext", "title: One\nnpc: Guard\nGuard: Halt!\n");
    write(dir.path(), "two.dstext", "title: Two\n<<group Choices>>\n\tLeft ->\n\tRight ->\n");

    let mut db = DialogueDatabase::new();
    import_batch(&mut db, &[dir.path().to_path_buf()], &ImportOptions::default());
    for convo in &db.conversations {
        let starts: Vec<_> = convo.entries.iter().filter(|e| e.id == START_ENTRY_ID).collect();
        assert_eq!(starts.len(), 1, "{}", convo.title);
        assert_eq!(starts[0].title, "START");
    }
}
