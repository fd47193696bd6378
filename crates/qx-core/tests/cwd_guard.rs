mod support;

use tempfile::TempDir;

use qx_core::cwd::CwdGuard;

fn enter_and_fail(path: &std::path::Path) -> anyhow::Result<()> {
    let _guard = CwdGuard::enter(path)?;
    anyhow::bail!("failed inside {}", path.display())
}

#[test]
fn guard_restores_directory_on_drop_leave_and_error() {
    let _lock = support::cwd_lock();
    let before = std::env::current_dir().unwrap();
    let temp = TempDir::new().unwrap();
    let target = temp.path().canonicalize().unwrap();

    {
        let _guard = CwdGuard::enter(&target).unwrap();
        assert_eq!(std::env::current_dir().unwrap().canonicalize().unwrap(), target);
    }
    assert_eq!(std::env::current_dir().unwrap(), before);

    let guard = CwdGuard::enter(&target).unwrap();
    guard.leave();
    assert_eq!(std::env::current_dir().unwrap(), before);

    assert!(enter_and_fail(&target).is_err());
    assert_eq!(std::env::current_dir().unwrap(), before);

    assert!(CwdGuard::enter(&target.join("missing")).is_err());
    assert_eq!(std::env::current_dir().unwrap(), before);
}
