//! Integration tests for the dynamic-library loader.
//!
//! The handler libraries under `test-plugins/` are built with the same cargo
//! and profile that runs these tests, then loaded through
//! `DylibModuleLoader`, both directly and via a full runtime startup.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};

use serde_json::{json, Value};

use kv_function_runtime::adapters::{DylibModuleLoader, InMemoryStore, StaticArtifactFetcher};
use kv_function_runtime::application::{module_file_names, CycleError, CycleOutcome, RuntimeBuilder};
use kv_function_runtime::config::{RuntimeConfig, StoreConfig};
use kv_function_runtime::domain::{ExecutionContext, InputPayload, HANDLER_ABI_VERSION};
use kv_function_runtime::ports::{LoadError, ModuleLoader, ResolvedModule};

// =============================================================================
// Test Infrastructure
// =============================================================================

const ZIP_URL: &str = "https://artifacts.example.com/functions/echo.zip";

/// Directory holding the built plugin libraries. Built once per test binary.
fn plugin_dir() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("plugins");
        let mut cargo = Command::new(env!("CARGO"));
        cargo
            .arg("build")
            .arg("--manifest-path")
            .arg(Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"))
            .args(["-p", "echo-handler", "-p", "abi-mismatch-handler"])
            .arg("--target-dir")
            .arg(&target_dir);
        if !cfg!(debug_assertions) {
            cargo.arg("--release");
        }

        let status = cargo.status().expect("failed to run cargo");
        assert!(status.success(), "building test plugins failed: {}", status);

        target_dir.join(if cfg!(debug_assertions) { "debug" } else { "release" })
    })
}

/// Path of the built library for crate `name` (e.g. `libecho_handler.so`).
fn plugin(name: &str) -> PathBuf {
    plugin_dir().join(&module_file_names(name)[0])
}

fn payload(value: Value) -> InputPayload {
    InputPayload::decode(&serde_json::to_vec(&value).unwrap()).unwrap()
}

fn mounted_config(path: &Path) -> RuntimeConfig {
    RuntimeConfig::load_from(HashMap::from([
        ("HANDLER_FUNCTION".to_string(), "echo_handler.handler".to_string()),
        ("HANDLER_FILE_PATH".to_string(), path.display().to_string()),
    ]))
    .unwrap()
}

// =============================================================================
// Loader
// =============================================================================

#[test]
fn exported_handler_loads_and_keeps_context_between_calls() {
    let module = ResolvedModule::mounted(plugin("echo_handler"), "echo_handler", "handler");
    let mut loaded = DylibModuleLoader::new().load(&module).unwrap();
    let mut context = ExecutionContext::new(&StoreConfig::default());

    assert!(loaded.library.is_some());
    assert!(loaded.id.as_str().starts_with("user_module::echo_handler::"));

    let first = loaded.handler.invoke(&payload(json!({"timestamp": "t1"})), &mut context).unwrap();
    let second = loaded.handler.invoke(&payload(json!({"timestamp": "t2"})), &mut context).unwrap();

    assert_eq!(first, json!({"calls": 1, "timestamp": "t1", "source": "metrics"}));
    assert_eq!(second, json!({"calls": 2, "timestamp": "t2", "source": "metrics"}));
    assert_eq!(context.env().get("calls"), Some(&json!(2)));
}

#[test]
fn handler_error_crosses_the_library_boundary() {
    let module = ResolvedModule::mounted(plugin("echo_handler"), "echo_handler", "handler");
    let mut loaded = DylibModuleLoader::new().load(&module).unwrap();
    let mut context = ExecutionContext::new(&StoreConfig::default());

    let err = loaded
        .handler
        .invoke(&payload(json!({"fail": true})), &mut context)
        .unwrap_err();

    assert!(err.to_string().contains("asked to fail"));
    assert!(context.env().is_empty());
}

#[test]
fn unknown_symbol_is_handler_not_found() {
    let module = ResolvedModule::mounted(plugin("echo_handler"), "echo_handler", "main");

    let result = DylibModuleLoader::new().load(&module);

    assert!(matches!(
        result,
        Err(LoadError::HandlerNotFound { ref module, ref symbol }) if module == "echo_handler" && symbol == "main"
    ));
}

#[test]
fn foreign_abi_marker_is_rejected() {
    let path = plugin("abi_mismatch_handler");
    let module = ResolvedModule::mounted(&path, "abi_mismatch_handler", "handler");

    let result = DylibModuleLoader::new().load(&module);

    match result {
        Err(LoadError::AbiMismatch { path: reported, found, expected }) => {
            assert_eq!(reported, path);
            assert_eq!(found, 0);
            assert_eq!(expected, HANDLER_ABI_VERSION);
        }
        other => panic!("expected AbiMismatch, got {:?}", other),
    }
}

// =============================================================================
// Runtime startup with the default loader
// =============================================================================

#[tokio::test]
async fn mounted_library_runs_through_the_polling_loop() {
    let store = InMemoryStore::new();
    let mut runtime = RuntimeBuilder::new(mounted_config(&plugin("echo_handler")))
        .with_store(Arc::new(store.clone()))
        .with_fetcher(Arc::new(StaticArtifactFetcher::new()))
        .build()
        .await
        .unwrap();

    store.insert("metrics", br#"{"timestamp": "t1"}"#.to_vec()).await;
    assert!(matches!(
        runtime.polling_loop_mut().poll_once().await.unwrap(),
        CycleOutcome::Published { diagnostic: false, .. }
    ));

    store.insert("metrics", br#"{"timestamp": "t2", "fail": true}"#.to_vec()).await;
    assert!(matches!(
        runtime.polling_loop_mut().poll_once().await,
        Err(CycleError::HandlerFault(_))
    ));

    let output: Value = serde_json::from_slice(&store.value("output").await.unwrap()).unwrap();
    assert_eq!(output, json!({"calls": 1, "timestamp": "t1", "source": "metrics"}));
}

#[tokio::test]
async fn archived_library_is_loaded_from_the_scratch_directory() {
    let library = std::fs::read(plugin("echo_handler")).unwrap();
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(
            format!("target/release/{}", module_file_names("echo_handler")[0]),
            zip::write::FileOptions::default(),
        )
        .unwrap();
    writer.write_all(&library).unwrap();
    let body = writer.finish().unwrap().into_inner();

    let config = RuntimeConfig::load_from(HashMap::from([
        ("HANDLER_FUNCTION".to_string(), "echo_handler.handler".to_string()),
        ("ZIP_URL".to_string(), ZIP_URL.to_string()),
    ]))
    .unwrap();
    let store = InMemoryStore::new();

    let mut runtime = RuntimeBuilder::new(config)
        .with_store(Arc::new(store.clone()))
        .with_fetcher(Arc::new(StaticArtifactFetcher::new().with_body(ZIP_URL, body)))
        .build()
        .await
        .unwrap();

    let scratch = runtime.polling_loop().artifact().scratch_dir().unwrap().to_path_buf();
    assert!(runtime.polling_loop().artifact().path().starts_with(&scratch));

    store.insert("metrics", br#"{"timestamp": 7}"#.to_vec()).await;
    runtime.polling_loop_mut().poll_once().await.unwrap();

    let output: Value = serde_json::from_slice(&store.value("output").await.unwrap()).unwrap();
    assert_eq!(output["timestamp"], json!(7));

    drop(runtime);
    assert!(!scratch.exists());
}
