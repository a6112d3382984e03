//! Launch pipeline
//!
//! Validates the install, merges the gateway catalog into the persisted list,
//! then hands war3.exe to the injection service:
//!
//! `Idle -> Validating -> Synchronizing -> Launching -> Succeeded | Failed`
//!
//! The gateway list is written before the launch is attempted and is not
//! rolled back if the launch fails.

use std::any::Any;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use crate::error::LaunchError;
use crate::gateways::{synchronize, GatewayCatalog, GatewayList, Synchronized};
use crate::injector::{InjectionReply, InjectionService, STATUS_EXECUTABLE_NOT_FOUND, STATUS_OK};
use crate::logging::{log_action, log_error, log_info, log_launch};
use crate::options::{encode, StartOptions};
use crate::registry::GatewayStore;

/// Game executable inside the install directory
pub const GAME_EXECUTABLE: &str = "war3.exe";

/// Loader support library that must sit next to the game executable
pub const SUPPORT_LIBRARY: &str = "w3lh.dll";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    Idle,
    Validating,
    Synchronizing,
    Launching,
    Succeeded,
    Failed,
}

impl LaunchStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, LaunchStage::Succeeded | LaunchStage::Failed)
    }
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchStage::Idle => "idle",
            LaunchStage::Validating => "validating",
            LaunchStage::Synchronizing => "synchronizing",
            LaunchStage::Launching => "launching",
            LaunchStage::Succeeded => "succeeded",
            LaunchStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Directories a launch works with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPaths {
    /// Warcraft III install directory
    pub install_dir: PathBuf,
    /// Current working directory, holding the support library to copy
    pub working_dir: PathBuf,
}

impl LaunchPaths {
    pub fn new(install_dir: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Paths for a launch started from the process's current directory
    pub fn from_current_dir(install_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        Ok(Self::new(install_dir, std::env::current_dir()?))
    }

    pub fn executable(&self) -> PathBuf {
        self.install_dir.join(GAME_EXECUTABLE)
    }

    pub fn support_library(&self) -> PathBuf {
        self.install_dir.join(SUPPORT_LIBRARY)
    }

    /// The copy in the working directory
    pub fn bundled_support_library(&self) -> PathBuf {
        self.working_dir.join(SUPPORT_LIBRARY)
    }
}

/// A launch that went through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSuccess {
    /// Informational message from the injection service, for the user
    pub message: Option<String>,
    /// Gateway the game will start on
    pub selected_gateway: usize,
}

/// Runs one launch from validation to hand-off
pub struct ProcessLauncher<S, I> {
    paths: LaunchPaths,
    catalog: GatewayCatalog,
    store: S,
    injector: I,
    stage: LaunchStage,
}

impl<S: GatewayStore, I: InjectionService> ProcessLauncher<S, I> {
    pub fn new(paths: LaunchPaths, catalog: GatewayCatalog, store: S, injector: I) -> Self {
        Self {
            paths,
            catalog,
            store,
            injector,
            stage: LaunchStage::Idle,
        }
    }

    pub fn stage(&self) -> LaunchStage {
        self.stage
    }

    pub fn paths(&self) -> &LaunchPaths {
        &self.paths
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    /// Run the launch. A launcher runs once; later calls fail.
    pub fn launch(&mut self, options: StartOptions, prefer_proxy: bool) -> Result<LaunchSuccess, LaunchError> {
        if self.stage != LaunchStage::Idle {
            return Err(LaunchError::UnexpectedFailure(format!(
                "launcher already ran (state: {})",
                self.stage
            )));
        }

        // A panicking store or injector ends the launch like any other failure
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(options, prefer_proxy)))
            .unwrap_or_else(|payload| {
                Err(LaunchError::UnexpectedFailure(format!(
                    "{} panicked: {}",
                    self.stage,
                    panic_message(payload.as_ref())
                )))
            });
        match &result {
            Ok(success) => {
                self.advance(LaunchStage::Succeeded);
                if let Some(message) = &success.message {
                    log_info(&format!("Startup message: {}", message));
                }
            }
            Err(err) => {
                log_error(&format!("Launch failed while {}: {}", self.stage, err));
                self.advance(LaunchStage::Failed);
            }
        }
        result
    }

    fn run(&mut self, options: StartOptions, prefer_proxy: bool) -> Result<LaunchSuccess, LaunchError> {
        self.advance(LaunchStage::Validating);
        validate_install(&self.paths)?;

        self.advance(LaunchStage::Synchronizing);
        let synced = sync_store(&mut self.store, &self.catalog, prefer_proxy)?;

        self.advance(LaunchStage::Launching);
        let message = self.hand_off(options)?;

        Ok(LaunchSuccess {
            message,
            selected_gateway: synced.selected_index,
        })
    }

    fn hand_off(&mut self, options: StartOptions) -> Result<Option<String>, LaunchError> {
        let executable = self.injector.host_path(&self.paths.executable());
        let command_line = build_command_line(&executable, options);

        let reply = self.injector.inject(&command_line, &executable)?;

        log_launch(&format!("Injection service returned status {}", reply.status));
        interpret_reply(reply, &executable)
    }

    fn advance(&mut self, next: LaunchStage) {
        log_launch(&format!("{} -> {}", self.stage, next));
        self.stage = next;
    }
}

/// Check the game executable and make sure the support library sits next to it
pub fn validate_install(paths: &LaunchPaths) -> Result<(), LaunchError> {
    let executable = paths.executable();
    if !executable.is_file() {
        return Err(LaunchError::ExecutableNotFound(executable));
    }

    let target = paths.support_library();
    if target.is_file() {
        return Ok(());
    }

    let source = paths.bundled_support_library();
    if !source.is_file() {
        return Err(LaunchError::SupportLibraryMissing(source));
    }

    log_action(&format!(
        "Copying {} to {}",
        source.display(),
        target.display()
    ));
    match fs::copy(&source, &target) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(LaunchError::AccessDenied(format!(
            "cannot copy {} to {}: {}",
            source.display(),
            target.display(),
            e
        ))),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(LaunchError::SupportLibraryMissing(source)),
        Err(e) => Err(LaunchError::UnexpectedFailure(format!(
            "copying {} failed: {}",
            SUPPORT_LIBRARY, e
        ))),
    }
}

/// Read the persisted list, merge the catalog and write it back once.
///
/// A malformed list is rejected before anything is written.
pub fn sync_store<S: GatewayStore + ?Sized>(
    store: &mut S,
    catalog: &GatewayCatalog,
    prefer_proxy: bool,
) -> Result<Synchronized, LaunchError> {
    let slots = store.read_gateways()?;
    let list = GatewayList::from_slots(slots)?;
    let synced = synchronize(list, catalog, prefer_proxy);

    store.write_gateways(&synced.list.to_slots())?;
    log_info(&format!(
        "Gateway list synchronized in {}: {} entries, {} added, {} updated, default #{}",
        store.describe(),
        synced.list.len(),
        synced.appended,
        synced.reconciled,
        synced.selected_index
    ));
    Ok(synced)
}

/// `"<executable>"` followed by the option tokens.
///
/// The quoted path is always present: the loader rejects a bare flag string.
pub fn build_command_line(executable: &str, options: StartOptions) -> String {
    format!("\"{}\"{}", executable, encode(options))
}

/// Map the injection service's status code to the launch outcome
pub fn interpret_reply(reply: InjectionReply, executable: &str) -> Result<Option<String>, LaunchError> {
    match reply.status {
        STATUS_OK => Ok(reply.message),
        STATUS_EXECUTABLE_NOT_FOUND => Err(LaunchError::ExecutableNotFoundAtRuntime(
            reply.message.unwrap_or_else(|| executable.to_string()),
        )),
        status => Err(LaunchError::InjectionFailed(
            reply
                .message
                .unwrap_or_else(|| format!("injection service returned status {}", status)),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InjectorError, StoreError};
    use crate::injector::STATUS_FAILED;
    use crate::options::StartOption;
    use crate::registry::MemoryStore;
    use std::path::Path;

    enum Behavior {
        Reply(InjectionReply),
        Unreachable,
        Panic,
    }

    struct FakeInjector {
        behavior: Behavior,
        calls: Vec<(String, String)>,
    }

    impl FakeInjector {
        fn replying(status: i32, message: Option<&str>) -> Self {
            Self {
                behavior: Behavior::Reply(InjectionReply::new(status, message.map(String::from))),
                calls: Vec::new(),
            }
        }

        fn with(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: Vec::new(),
            }
        }
    }

    impl InjectionService for FakeInjector {
        fn inject(&mut self, command_line: &str, executable_path: &str) -> Result<InjectionReply, InjectorError> {
            self.calls.push((command_line.to_string(), executable_path.to_string()));
            match &self.behavior {
                Behavior::Reply(reply) => Ok(reply.clone()),
                Behavior::Unreachable => Err(InjectorError::NotFound(PathBuf::from("w3l.exe"))),
                Behavior::Panic => panic!("loader crashed"),
            }
        }
    }

    struct Fixture {
        _root: tempfile::TempDir,
        paths: LaunchPaths,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let install = root.path().join("Warcraft III");
        let working = root.path().join("loader");
        fs::create_dir_all(&install).unwrap();
        fs::create_dir_all(&working).unwrap();
        fs::write(install.join(GAME_EXECUTABLE), b"MZ").unwrap();
        fs::write(working.join(SUPPORT_LIBRARY), b"MZ").unwrap();
        Fixture {
            paths: LaunchPaths::new(install, working),
            _root: root,
        }
    }

    fn blizzard_store() -> MemoryStore {
        MemoryStore::new(
            [
                "1001", "00",
                "uswest.battle.net", "8", "Lordaeron (U.S. West)",
                "useast.battle.net", "6", "Azeroth (U.S. East)",
            ]
            .map(String::from)
            .to_vec(),
        )
    }

    fn launcher(
        paths: &LaunchPaths,
        store: MemoryStore,
        injector: FakeInjector,
    ) -> ProcessLauncher<MemoryStore, FakeInjector> {
        ProcessLauncher::new(paths.clone(), GatewayCatalog::eurobattle(), store, injector)
    }

    #[test]
    fn successful_launch() {
        let fx = fixture();
        let mut launcher = launcher(
            &fx.paths,
            blizzard_store(),
            FakeInjector::replying(STATUS_OK, Some("Welcome to Eurobattle.Net")),
        );
        let options: StartOptions = [StartOption::Window, StartOption::Classic].into_iter().collect();

        let success = launcher.launch(options, false).unwrap();

        assert_eq!(success.message.as_deref(), Some("Welcome to Eurobattle.Net"));
        assert_eq!(success.selected_gateway, 2);
        assert_eq!(launcher.stage(), LaunchStage::Succeeded);

        let exe = fx.paths.executable().display().to_string();
        let calls = &launcher.injector().calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, format!("\"{}\" -window  -classic ", exe));
        assert_eq!(calls[0].0.matches("-window").count(), 1);
        assert_eq!(calls[0].0.matches("-classic").count(), 1);
        assert_eq!(calls[0].1, exe);

        assert!(launcher.paths().support_library().is_file());
        let store = launcher.store();
        assert_eq!(store.writes(), 1);
        let slots = store.slots().unwrap();
        assert_eq!(slots.len(), 2 + 4 * 3);
        assert_eq!(slots[1], "02");
    }

    #[test]
    fn command_line_without_options_is_just_the_path() {
        assert_eq!(
            build_command_line(r"Z:\games\war3.exe", StartOptions::NONE),
            "\"Z:\\games\\war3.exe\""
        );
    }

    #[test]
    fn missing_executable_stops_before_sync() {
        let fx = fixture();
        fs::remove_file(fx.paths.executable()).unwrap();
        let mut launcher = launcher(&fx.paths, blizzard_store(), FakeInjector::replying(STATUS_OK, None));

        let err = launcher.launch(StartOptions::NONE, false).unwrap_err();

        match err {
            LaunchError::ExecutableNotFound(path) => assert_eq!(path, fx.paths.executable()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(launcher.stage(), LaunchStage::Failed);
        assert_eq!(launcher.store().writes(), 0);
        assert!(launcher.injector().calls.is_empty());
    }

    #[test]
    fn existing_support_library_is_left_alone() {
        let fx = fixture();
        fs::write(fx.paths.support_library(), b"installed").unwrap();
        fs::remove_file(fx.paths.bundled_support_library()).unwrap();

        validate_install(&fx.paths).unwrap();
        assert_eq!(fs::read(fx.paths.support_library()).unwrap(), b"installed");
    }

    #[test]
    fn missing_support_library_everywhere() {
        let fx = fixture();
        fs::remove_file(fx.paths.bundled_support_library()).unwrap();
        let mut launcher = launcher(&fx.paths, blizzard_store(), FakeInjector::replying(STATUS_OK, None));

        let err = launcher.launch(StartOptions::NONE, false).unwrap_err();

        assert!(matches!(err, LaunchError::SupportLibraryMissing(ref p) if p == &fx.paths.bundled_support_library()));
        assert_eq!(err.stage(), Some(LaunchStage::Validating));
        assert_eq!(launcher.store().writes(), 0);
    }

    #[test]
    fn malformed_list_is_not_written() {
        let fx = fixture();
        let store = MemoryStore::new(["1001", "00", "host", "8"].map(String::from).to_vec());
        let mut launcher = launcher(&fx.paths, store, FakeInjector::replying(STATUS_OK, None));

        let err = launcher.launch(StartOptions::NONE, false).unwrap_err();

        assert!(matches!(err, LaunchError::ConfigurationFormatError(_)));
        assert_eq!(launcher.store().writes(), 0);
        assert_eq!(launcher.store().slots().unwrap().len(), 4);
        assert!(launcher.injector().calls.is_empty());
    }

    #[test]
    fn missing_gateway_value_is_a_format_error() {
        let fx = fixture();
        let mut launcher = launcher(&fx.paths, MemoryStore::empty(), FakeInjector::replying(STATUS_OK, None));
        let err = launcher.launch(StartOptions::NONE, false).unwrap_err();
        assert!(matches!(err, LaunchError::ConfigurationFormatError(_)));
    }

    #[test]
    fn status_two_reports_runtime_path_and_keeps_sync() {
        let fx = fixture();
        let mut launcher = launcher(
            &fx.paths,
            blizzard_store(),
            FakeInjector::replying(STATUS_EXECUTABLE_NOT_FOUND, Some(r"C:\Games\Warcraft III")),
        );

        let err = launcher.launch(StartOptions::NONE, true).unwrap_err();

        match err {
            LaunchError::ExecutableNotFoundAtRuntime(path) => assert_eq!(path, r"C:\Games\Warcraft III"),
            other => panic!("unexpected error: {other:?}"),
        }
        // no rollback of the gateway list
        assert_eq!(launcher.store().writes(), 1);
        assert_eq!(launcher.store().slots().unwrap()[1], "03");
    }

    #[test]
    fn other_statuses_are_injection_failures() {
        for (status, message) in [(STATUS_FAILED, Some("patch failed")), (7, None)] {
            let fx = fixture();
            let mut launcher = launcher(&fx.paths, blizzard_store(), FakeInjector::replying(status, message));

            let err = launcher.launch(StartOptions::NONE, false).unwrap_err();

            match err {
                LaunchError::InjectionFailed(msg) => match message {
                    Some(m) => assert_eq!(msg, m),
                    None => assert!(msg.contains('7')),
                },
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn unreachable_service_is_unexpected() {
        let fx = fixture();
        let mut launcher = launcher(&fx.paths, blizzard_store(), FakeInjector::with(Behavior::Unreachable));
        let err = launcher.launch(StartOptions::NONE, false).unwrap_err();
        assert!(matches!(err, LaunchError::UnexpectedFailure(_)));
        assert_eq!(launcher.stage(), LaunchStage::Failed);
    }

    #[test]
    fn panicking_service_is_caught() {
        let fx = fixture();
        let mut launcher = launcher(&fx.paths, blizzard_store(), FakeInjector::with(Behavior::Panic));
        let err = launcher.launch(StartOptions::NONE, false).unwrap_err();
        match err {
            LaunchError::UnexpectedFailure(msg) => assert!(msg.contains("loader crashed")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn launcher_runs_once() {
        let fx = fixture();
        let mut launcher = launcher(&fx.paths, blizzard_store(), FakeInjector::replying(STATUS_OK, None));
        launcher.launch(StartOptions::NONE, false).unwrap();

        let err = launcher.launch(StartOptions::NONE, false).unwrap_err();
        assert!(matches!(err, LaunchError::UnexpectedFailure(_)));
        assert_eq!(launcher.stage(), LaunchStage::Succeeded);
        assert_eq!(launcher.injector().calls.len(), 1);
    }

    /// Store whose read panics or whose write is refused by the filesystem
    enum StoreFault {
        PanicOnRead,
        DenyWrite,
    }

    struct FaultyStore {
        inner: MemoryStore,
        fault: StoreFault,
    }

    impl GatewayStore for FaultyStore {
        fn read_gateways(&self) -> Result<Vec<String>, StoreError> {
            match self.fault {
                StoreFault::PanicOnRead => panic!("hive is corrupt"),
                StoreFault::DenyWrite => self.inner.read_gateways(),
            }
        }

        fn write_gateways(&mut self, _slots: &[String]) -> Result<(), StoreError> {
            Err(StoreError::io(
                "/prefix/user.reg",
                std::io::Error::new(ErrorKind::PermissionDenied, "read-only prefix"),
            ))
        }

        fn describe(&self) -> String {
            "faulty store".to_string()
        }
    }

    fn faulty_launcher(paths: &LaunchPaths, fault: StoreFault) -> ProcessLauncher<FaultyStore, FakeInjector> {
        let store = FaultyStore {
            inner: blizzard_store(),
            fault,
        };
        ProcessLauncher::new(
            paths.clone(),
            GatewayCatalog::eurobattle(),
            store,
            FakeInjector::replying(STATUS_OK, None),
        )
    }

    #[test]
    fn panicking_store_ends_in_failed() {
        let fx = fixture();
        let mut launcher = faulty_launcher(&fx.paths, StoreFault::PanicOnRead);

        let err = launcher.launch(StartOptions::NONE, false).unwrap_err();

        match err {
            LaunchError::UnexpectedFailure(msg) => {
                assert!(msg.contains("synchronizing"));
                assert!(msg.contains("hive is corrupt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(launcher.stage(), LaunchStage::Failed);
        assert!(launcher.stage().is_terminal());
        assert!(launcher.injector().calls.is_empty());
    }

    #[test]
    fn denied_store_write_stops_before_launch() {
        let fx = fixture();
        let mut launcher = faulty_launcher(&fx.paths, StoreFault::DenyWrite);

        let err = launcher.launch(StartOptions::NONE, false).unwrap_err();

        assert!(matches!(err, LaunchError::AccessDenied(_)));
        assert_eq!(launcher.stage(), LaunchStage::Failed);
        assert!(launcher.injector().calls.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn read_only_install_dir_denies_copy() {
        use std::os::unix::fs::PermissionsExt;

        let fx = fixture();
        let install = fx.paths.install_dir.clone();
        fs::set_permissions(&install, fs::Permissions::from_mode(0o555)).unwrap();

        // root ignores directory permissions
        let writable = fs::write(install.join(".write-test"), b"").is_ok();
        if !writable {
            let mut launcher = launcher(&fx.paths, blizzard_store(), FakeInjector::replying(STATUS_OK, None));
            let err = launcher.launch(StartOptions::NONE, false).unwrap_err();

            assert!(matches!(err, LaunchError::AccessDenied(_)));
            assert!(!launcher.paths().support_library().exists());
            assert_eq!(launcher.store().writes(), 0);
            assert!(launcher.injector().calls.is_empty());
        }

        fs::set_permissions(&install, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn support_library_comes_from_current_dir() {
        let paths = LaunchPaths::from_current_dir("/games/Warcraft III").unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(paths.working_dir, cwd);
        assert_eq!(paths.bundled_support_library(), cwd.join(SUPPORT_LIBRARY));
    }

    #[test]
    fn stages_before_the_end_are_not_terminal() {
        assert!(!LaunchStage::Synchronizing.is_terminal());
        assert!(LaunchStage::Failed.is_terminal());
    }

    #[test]
    fn reply_mapping() {
        let exe = Path::new("/g/war3.exe").display().to_string();
        assert_eq!(interpret_reply(InjectionReply::new(0, None), &exe).unwrap(), None);
        assert!(matches!(
            interpret_reply(InjectionReply::new(2, None), &exe),
            Err(LaunchError::ExecutableNotFoundAtRuntime(p)) if p == exe
        ));
        assert!(matches!(
            interpret_reply(InjectionReply::new(-1, Some("boom".into())), &exe),
            Err(LaunchError::InjectionFailed(m)) if m == "boom"
        ));
    }
}
