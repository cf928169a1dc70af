mod common;

use std::sync::Arc;

use common::*;
use ondevice_intent::{
    assets::sha256_hex, ClassifierError, ClassifierService, Delegate, EngineState, MemoryAssets,
    RuntimeConfig, StaticPlatform,
};

#[test]
fn test_classify_before_initialize() {
    let loader = MockLoader::default();
    let mut service = builder(&loader).build().unwrap();

    assert!(matches!(service.classify("hello"), Err(ClassifierError::NotInitialized)));
    assert!(matches!(service.model_info(), Err(ClassifierError::NotInitialized)));
    assert!(matches!(service.benchmark(3), Err(ClassifierError::NotInitialized)));
}

#[test]
fn test_end_to_end_classification() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let mut service = ready_service(&loader);

    let result = service.classify("Hello, world!")?;
    assert_eq!(result.intent, "greeting");
    assert_eq!(result.all_scores.len(), 3);
    let total: f32 = result.all_scores.iter().sum();
    assert!((total - 1.0).abs() < 1e-5);
    assert_eq!(result.confidence, result.all_scores[0]);

    assert_eq!(service.classify("Is it going to rain?")?.intent, "weather");
    assert_eq!(service.classify("What TIME is it")?.intent, "time");
    Ok(())
}

#[test]
fn test_empty_and_unknown_input_still_classifies() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let mut service = ready_service(&loader);

    for text in ["", "?!", "zebra quantum marmalade"] {
        let result = service.classify(text)?;
        // All logits equal: the first label wins with uniform confidence
        assert_eq!(result.intent, "greeting");
        assert!((result.confidence - 1.0 / 3.0).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn test_model_info() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let service = ready_service(&loader);

    let info = service.model_info()?;
    assert_eq!(info.input_shape, vec![1, 128]);
    assert_eq!(info.output_shape, vec![1, 3]);
    assert_eq!(info.intent_count, 3);
    assert_eq!(info.vocabulary_size, 11);
    assert_eq!(info.max_sequence_length, 128);
    assert_eq!(info.delegate, None);
    assert_eq!(info.model_name, None);
    Ok(())
}

#[test]
fn test_model_load_failure_leaves_service_uninitialized() {
    let loader = MockLoader::default();
    let assets = common::assets().with("model.onnx", CORRUPT_MODEL);
    let mut service = ClassifierService::builder()
        .with_resources(assets)
        .with_engine_loader(loader.clone())
        .build()
        .unwrap();

    assert!(matches!(service.initialize(), Err(ClassifierError::ModelLoad(_))));
    assert!(!service.is_initialized());
    assert!(matches!(service.classify("hello"), Err(ClassifierError::NotInitialized)));
}

#[test]
fn test_missing_model_file_is_model_error() {
    let loader = MockLoader::default();
    let assets = MemoryAssets::new().with("vocab.txt", VOCAB).with("labels.txt", LABELS);
    let mut service = ClassifierService::builder()
        .with_resources(assets)
        .with_engine_loader(loader.clone())
        .build()
        .unwrap();

    assert!(matches!(service.initialize(), Err(ClassifierError::ModelLoad(_))));
    assert!(loader.requests().is_empty());
}

#[test]
fn test_resource_failures_abort_before_model_load() {
    let loader = MockLoader::default();

    let missing_vocab = MemoryAssets::new().with("labels.txt", LABELS).with("model.onnx", MODEL);
    let mut service = ClassifierService::builder()
        .with_resources(missing_vocab)
        .with_engine_loader(loader.clone())
        .build()
        .unwrap();
    match service.initialize() {
        Err(ClassifierError::ResourceLoad { resource, .. }) => assert_eq!(resource, "vocab.txt"),
        other => panic!("unexpected result: {:?}", other),
    }

    let empty_labels = common::assets().with("labels.txt", "\n\n");
    let mut service = ClassifierService::builder()
        .with_resources(empty_labels)
        .with_engine_loader(loader.clone())
        .build()
        .unwrap();
    match service.initialize() {
        Err(ClassifierError::ResourceLoad { resource, .. }) => assert_eq!(resource, "labels.txt"),
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(loader.requests().is_empty(), "model must not be loaded after a resource failure");
}

#[test]
fn test_delegate_failure_falls_back_to_cpu() -> Result<(), ClassifierError> {
    let loader = MockLoader {
        reject_delegates: true,
        ..Default::default()
    };
    let mut service = builder(&loader)
        .with_platform(StaticPlatform("android".into()))
        .build()?;

    service.initialize()?;
    assert_eq!(loader.requests(), vec![Some(Delegate::Nnapi), None]);
    assert_eq!(service.model_info()?.delegate, None);
    assert_eq!(service.classify("hello there")?.intent, "greeting");
    Ok(())
}

#[test]
fn test_unsupported_op_under_delegate_falls_back_to_cpu() -> Result<(), ClassifierError> {
    let loader = MockLoader {
        reject_delegates: true,
        delegate_failure: "graph partitioning failed: unsupported op 'Gather'",
        ..Default::default()
    };
    let mut service = builder(&loader)
        .with_platform(StaticPlatform("ios".into()))
        .build()?;

    service.initialize()?;
    assert_eq!(loader.requests(), vec![Some(Delegate::CoreMl), None]);
    assert_eq!(service.model_info()?.delegate, None);
    assert_eq!(service.classify("is it going to rain")?.intent, "weather");
    Ok(())
}

#[test]
fn test_delegate_attached_on_apple_platforms() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let mut service = builder(&loader)
        .with_platform(StaticPlatform("ios".into()))
        .build()?;

    service.initialize()?;
    assert_eq!(loader.requests(), vec![Some(Delegate::CoreMl)]);
    assert_eq!(service.model_info()?.delegate, Some(Delegate::CoreMl));
    Ok(())
}

#[test]
fn test_missing_or_unknown_platform_uses_cpu() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    ready_service(&loader);
    assert_eq!(loader.requests(), vec![None]);

    let loader = MockLoader::default();
    let mut service = builder(&loader)
        .with_platform(StaticPlatform("plan9".into()))
        .build()?;
    service.initialize()?;
    assert_eq!(loader.requests(), vec![None]);
    Ok(())
}

#[test]
fn test_delegate_can_be_disabled() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let mut service = builder(&loader)
        .with_platform(StaticPlatform("android".into()))
        .with_runtime_config(RuntimeConfig {
            use_delegate: false,
            ..RuntimeConfig::default()
        })
        .build()?;
    service.initialize()?;
    assert_eq!(loader.requests(), vec![None]);
    Ok(())
}

#[test]
fn test_dispose_is_idempotent() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let mut service = ready_service(&loader);

    service.dispose();
    assert!(!service.is_initialized());
    service.dispose();
    assert!(!service.is_initialized());
    assert!(matches!(service.classify("hello"), Err(ClassifierError::NotInitialized)));

    // A disposed service can be brought up again
    service.initialize()?;
    assert_eq!(service.classify("hello")?.intent, "greeting");
    assert_eq!(loader.requests().len(), 2);
    Ok(())
}

#[test]
fn test_initialize_is_one_shot() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let mut service = ready_service(&loader);
    service.initialize()?;
    service.initialize()?;
    assert_eq!(loader.requests().len(), 1);
    Ok(())
}

#[test]
fn test_shape_mismatch_only_fails_the_call() -> Result<(), ClassifierError> {
    let loader = MockLoader {
        input_len: 32,
        ..Default::default()
    };
    let mut service = ready_service(&loader);

    let err = service.classify("hello").unwrap_err();
    assert!(matches!(err, ClassifierError::ShapeMismatch { .. }));
    assert!(err.is_per_call());
    assert!(service.is_initialized());
    assert!(service.model_info().is_ok());
    Ok(())
}

#[test]
fn test_output_width_must_match_labels() {
    let loader = MockLoader {
        classes: 5,
        ..Default::default()
    };
    let mut service = builder(&loader).build().unwrap();
    assert!(matches!(service.initialize(), Err(ClassifierError::ModelLoad(_))));
    assert!(!service.is_initialized());
}

#[test]
fn test_engine_must_be_ready_after_load() {
    let loader = MockLoader {
        engine_state: EngineState::Disposed,
        ..Default::default()
    };
    let mut service = builder(&loader).build().unwrap();
    assert!(matches!(service.initialize(), Err(ClassifierError::ModelLoad(_))));
    assert!(!service.is_initialized());
}

#[test]
fn test_metadata_is_read_and_checked() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let metadata = r#"{
        "model_name": "Intent Classification Model",
        "model_version": "1.0.0",
        "class_names": ["greeting", "weather", "time"],
        "max_sequence_length": 128
    }"#;
    let mut service = ClassifierService::builder()
        .with_resources(common::assets().with("model_metadata.json", metadata))
        .with_engine_loader(loader.clone())
        .build()?;
    service.initialize()?;
    let info = service.model_info()?;
    assert_eq!(info.model_name.as_deref(), Some("Intent Classification Model"));
    assert_eq!(info.model_version.as_deref(), Some("1.0.0"));

    let reordered = r#"{"class_names": ["weather", "greeting", "time"]}"#;
    let mut service = ClassifierService::builder()
        .with_resources(common::assets().with("model_metadata.json", reordered))
        .with_engine_loader(loader.clone())
        .build()?;
    assert!(matches!(service.initialize(), Err(ClassifierError::ResourceLoad { .. })));
    Ok(())
}

#[test]
fn test_model_hash_verification() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();

    let mut service = builder(&loader).with_model_hash(sha256_hex(MODEL)).build()?;
    assert!(service.initialize().is_ok());

    let mut service = builder(&loader).with_model_hash(sha256_hex(b"something else")).build()?;
    assert!(matches!(service.initialize(), Err(ClassifierError::ModelLoad(_))));
    Ok(())
}

#[test]
fn test_instances_are_independent() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let mut first = ready_service(&loader);
    let mut second = ready_service(&loader);

    first.dispose();
    assert!(matches!(first.classify("hello"), Err(ClassifierError::NotInitialized)));
    assert_eq!(second.classify("hello")?.intent, "greeting");
    Ok(())
}

#[test]
fn test_service_moves_across_threads() {
    let loader = MockLoader::default();
    let mut service = ready_service(&loader);
    std::thread::spawn(move || {
        service.classify("what is the weather").unwrap();
    })
    .join()
    .unwrap();
}

#[test]
fn test_benchmark_statistics() -> Result<(), ClassifierError> {
    let clock = ManualClock::new();
    let loader = MockLoader {
        clock: Some(Arc::clone(&clock)),
        latencies: vec![10, 20, 30, 40, 50],
        ..Default::default()
    };
    let mut service = builder(&loader).with_clock(clock).build()?;
    service.initialize()?;

    let stats = service.benchmark(5)?;
    assert_eq!(stats.iterations, 5);
    assert_eq!(stats.median_ms, 30);
    assert!((stats.average_ms - 30.0).abs() < 1e-9);
    assert_eq!(stats.min_ms, 10);
    assert_eq!(stats.max_ms, 50);
    assert_eq!(stats.p95_ms, 50);
    assert!(stats.average_confidence > 0.0 && stats.average_confidence <= 1.0);
    assert_eq!(loader.runs(), 5);
    Ok(())
}

#[test]
fn test_benchmark_cycles_through_phrases() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let mut service = builder(&loader)
        .with_benchmark_phrases(vec!["hello", "weather"])
        .build()?;
    service.initialize()?;

    let stats = service.benchmark(7)?;
    assert_eq!(stats.iterations, 7);
    assert_eq!(loader.runs(), 7);
    // hello = 1, weather = 3
    assert_eq!(loader.first_ids(), vec![1, 3, 1, 3, 1, 3, 1]);
    Ok(())
}

#[test]
fn test_benchmark_rejects_bad_requests() -> Result<(), ClassifierError> {
    let loader = MockLoader::default();
    let mut service = ready_service(&loader);
    assert!(matches!(service.benchmark(0), Err(ClassifierError::Validation(_))));

    let mut service = builder(&loader)
        .with_benchmark_phrases(Vec::<String>::new())
        .build()?;
    service.initialize()?;
    assert!(matches!(service.benchmark(3), Err(ClassifierError::Validation(_))));
    Ok(())
}

#[test]
fn test_inference_time_uses_clock() -> Result<(), ClassifierError> {
    let clock = ManualClock::new();
    let loader = MockLoader {
        clock: Some(Arc::clone(&clock)),
        latencies: vec![42],
        ..Default::default()
    };
    let mut service = builder(&loader).with_clock(clock).build()?;
    service.initialize()?;
    assert_eq!(service.classify("what time is it")?.inference_time_ms, 42);
    Ok(())
}
