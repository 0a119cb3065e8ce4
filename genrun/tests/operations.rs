//! End-to-end operation tests against stub generator commands.
//!
//! Stubs are `sh -c` scripts configured as the generator or package-manager
//! command prefix, so each test controls exactly what the child prints and
//! how long it lives.

#![cfg(unix)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use genrun::io::config::{GeneratorConfig, ToolConfig};
use genrun::io::generator::{
    CI_CD_UNSUPPORTED_MESSAGE, GENERATE_MESSAGE, IMPORT_JDL_MESSAGE, INSTALL_MESSAGE,
};
use genrun::test_support::{process_exists, sh_prefix};
use genrun::{
    CiCdTool, GenerationJobId, GeneratorError, GeneratorService, MemoryLogSink, ShutdownSignal,
};

fn config(generator: &str, package_manager: &str, timeout_secs: u64) -> GeneratorConfig {
    GeneratorConfig {
        timeout_secs,
        generator: ToolConfig::new(sh_prefix(generator)),
        package_manager: ToolConfig::new(sh_prefix(package_manager)),
    }
}

fn service(cfg: &GeneratorConfig, sink: &Arc<MemoryLogSink>) -> GeneratorService {
    GeneratorService::new(cfg, sink.clone(), ShutdownSignal::new()).expect("service")
}

/// Package manager stub printing `ok` yields exactly that line after the message.
#[test]
fn install_with_ok_stub_logs_single_line() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(MemoryLogSink::new());
    let svc = service(&config("exit 0", "echo ok; exit 0", 10), &sink);
    let job = GenerationJobId::new("job-install");

    let outcome = svc.install_dependencies(&job, temp.path()).expect("install");

    assert!(outcome.success());
    assert_eq!(sink.logs(&job), vec![INSTALL_MESSAGE, "ok"]);
}

/// A command that exits immediately without output adds no child lines.
#[test]
fn silent_commands_add_only_the_operation_message() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(MemoryLogSink::new());
    let svc = service(&config("exit 0", "exit 0", 10), &sink);

    let generate = GenerationJobId::new("job-generate");
    svc.generate_application(&generate, temp.path())
        .expect("generate");
    assert_eq!(sink.logs(&generate), vec![GENERATE_MESSAGE]);

    let import = GenerationJobId::new("job-import");
    svc.import_jdl(&import, temp.path(), "model").expect("import");
    assert_eq!(sink.logs(&import), vec![IMPORT_JDL_MESSAGE]);

    let ci = GenerationJobId::new("job-ci");
    svc.configure_ci_cd(&ci, temp.path(), Some(CiCdTool::Jenkins))
        .expect("ci-cd");
    assert_eq!(sink.logs(&ci).len(), 1);
}

/// Every stdout line arrives once, in order, before the call returns.
#[test]
fn lines_arrive_in_order_exactly_once() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(MemoryLogSink::new());
    let script = "i=0; while [ $i -lt 200 ]; do echo line-$i; i=$((i+1)); done";
    let svc = service(&config(script, "exit 0", 10), &sink);
    let job = GenerationJobId::new("job-order");

    let outcome = svc.generate_application(&job, temp.path()).expect("generate");

    let logs = sink.logs(&job);
    let expected: Vec<String> = std::iter::once(GENERATE_MESSAGE.to_string())
        .chain((0..200).map(|i| format!("line-{i}")))
        .collect();
    assert_eq!(logs, expected);
    assert_eq!(outcome.lines, 200);
}

/// Lines are delivered while the child is still running, not only after exit.
#[test]
fn lines_are_delivered_while_child_runs() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(MemoryLogSink::new());
    let svc = Arc::new(service(&config("echo early; sleep 2; echo late", "exit 0", 10), &sink));
    let job = GenerationJobId::new("job-stream");

    let worker = {
        let svc = Arc::clone(&svc);
        let job = job.clone();
        let dir = temp.path().to_path_buf();
        thread::spawn(move || svc.generate_application(&job, &dir))
    };

    let deadline = Instant::now() + Duration::from_secs(1);
    let mut seen_early = false;
    while Instant::now() < deadline {
        if sink.logs(&job).iter().any(|line| line == "early") {
            seen_early = true;
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert!(seen_early, "first line should be visible before the child exits");
    assert!(!sink.logs(&job).iter().any(|line| line == "late"));

    worker.join().expect("join").expect("generate");
    assert_eq!(sink.logs(&job), vec![GENERATE_MESSAGE, "early", "late"]);
}

/// Generator stub sleeping 5s with a 1s timeout is killed and the call returns promptly.
///
/// The shell stays the parent of `sleep`, so the kill has to reach the whole
/// process tree for stdout to close in time.
#[test]
fn timeout_kills_generator_and_returns_promptly() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(MemoryLogSink::new());
    let svc = service(&config("echo starting; sleep 5", "exit 0", 1), &sink);
    let job = GenerationJobId::new("job-timeout");

    let start = Instant::now();
    let outcome = svc.generate_application(&job, temp.path()).expect("generate");
    let elapsed = start.elapsed();

    assert!(outcome.timed_out);
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(3), "returned after {elapsed:?}");
    assert!(!process_exists(outcome.pid));
    assert_eq!(sink.logs(&job), vec![GENERATE_MESSAGE, "starting"]);
}

/// An unknown CI tool never starts the generator and is logged before failing.
#[test]
fn unknown_ci_tool_never_starts_a_process() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(MemoryLogSink::new());
    let svc = service(&config("touch started", "exit 0", 10), &sink);
    let job = GenerationJobId::new("job-ci");

    let err = svc
        .configure_ci_cd_by_name(&job, temp.path(), "teamcity")
        .unwrap_err();
    assert!(matches!(err, GeneratorError::InvalidArgument(_)));

    let err = svc.configure_ci_cd(&job, temp.path(), None).unwrap_err();
    assert!(matches!(err, GeneratorError::InvalidArgument(_)));

    assert!(!temp.path().join("started").exists());
    assert_eq!(
        sink.logs(&job),
        vec![CI_CD_UNSUPPORTED_MESSAGE, CI_CD_UNSUPPORTED_MESSAGE]
    );
}

/// The generator runs inside the caller's working directory and sees `<base>.jh`.
#[test]
fn import_runs_in_working_directory_with_extension() {
    let temp = tempfile::tempdir().expect("tempdir");
    std::fs::write(temp.path().join("shop.v2.jh"), "entity Order {}\n").expect("write jdl");
    let sink = Arc::new(MemoryLogSink::new());
    let svc = service(&config("cat \"$2\"", "exit 0", 10), &sink);
    let job = GenerationJobId::new("job-jdl");

    svc.import_jdl(&job, temp.path(), "shop.v2").expect("import");

    assert_eq!(sink.logs(&job), vec![IMPORT_JDL_MESSAGE, "entity Order {}"]);
}

/// A working directory that does not exist fails to start with a spawn error.
#[test]
fn missing_working_directory_is_a_start_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(MemoryLogSink::new());
    let svc = service(&config("echo never", "exit 0", 10), &sink);
    let job = GenerationJobId::new("job-missing");

    let err = svc
        .generate_application(&job, &temp.path().join("gone"))
        .unwrap_err();

    assert!(matches!(err, GeneratorError::Spawn { .. }));
    assert_eq!(sink.logs(&job), vec![GENERATE_MESSAGE]);
}

/// Two jobs running at the same time keep their lines in their own streams.
#[test]
fn concurrent_jobs_do_not_interleave() {
    let sink = Arc::new(MemoryLogSink::new());
    let script = "i=0; while [ $i -lt 50 ]; do echo \"$(basename \"$(pwd -P)\")-$i\"; i=$((i+1)); sleep 0.01; done";
    let svc = Arc::new(service(&config(script, "exit 0", 30), &sink));
    let root = tempfile::tempdir().expect("tempdir");

    let handles: Vec<_> = ["alpha", "beta"]
        .into_iter()
        .map(|name| {
            let dir = root.path().join(name);
            std::fs::create_dir(&dir).expect("create workdir");
            let svc = Arc::clone(&svc);
            thread::spawn(move || {
                let job = GenerationJobId::new(name);
                svc.generate_application(&job, &dir).expect("generate");
                job
            })
        })
        .collect();

    for handle in handles {
        let job = handle.join().expect("join");
        let logs = sink.logs(&job);
        let expected: Vec<String> = std::iter::once(GENERATE_MESSAGE.to_string())
            .chain((0..50).map(|i| format!("{job}-{i}")))
            .collect();
        assert_eq!(logs, expected);
    }
}

/// A shutdown request during the wait surfaces as an error once output closes.
#[test]
fn shutdown_surfaces_watchdog_interruption() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(MemoryLogSink::new());
    let shutdown = ShutdownSignal::new();
    let svc = GeneratorService::new(
        &config("echo working; sleep 0.6; echo done", "exit 0", 30),
        sink.clone(),
        shutdown.clone(),
    )
    .expect("service");
    let job = GenerationJobId::new("job-shutdown");

    let trigger = {
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            shutdown.trigger();
        })
    };
    let err = svc.generate_application(&job, temp.path()).unwrap_err();
    trigger.join().expect("join");

    assert!(matches!(err, GeneratorError::WatchdogInterrupted { .. }));
    assert_eq!(sink.logs(&job), vec![GENERATE_MESSAGE, "working", "done"]);

    // Later operations refuse to start anything.
    let next = GenerationJobId::new("job-after-shutdown");
    let err = svc.install_dependencies(&next, temp.path()).unwrap_err();
    assert!(matches!(err, GeneratorError::WatchdogInterrupted { .. }));
    assert_eq!(sink.logs(&next), vec![INSTALL_MESSAGE]);
}

#[test]
fn default_config_targets_real_tools() {
    let cfg = GeneratorConfig::default();
    assert_eq!(cfg.generator.command, vec!["jhipster"]);
    assert_eq!(cfg.package_manager.command, vec!["npm"]);
    assert_eq!(cfg.timeout(), Duration::from_secs(600));
}
