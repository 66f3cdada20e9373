//! `pyrail check` - run every enabled check plugin
//!
//! Repository-wide checks run first, then per-project checks in discovery
//! order. Any failed check with `Error` severity makes the command fail.

use crate::core::context::AppContext;
use crate::core::error::{RailError, RailResult, ValidationError};
use crate::plugins::checks::{self, CheckContext};
use crate::ui;

/// Run the check command
pub fn run_check(ctx: &AppContext, json: bool) -> RailResult<()> {
  let check_ctx = CheckContext::new(&ctx.repository, &ctx.registry)?;
  let results = checks::run_all(&ctx.registry, &check_ctx)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&results)?);
  } else {
    ui::print_check_results(&results);
  }

  let blocking = results.iter().filter(|r| r.is_blocking()).count();
  if blocking > 0 {
    return Err(RailError::Validation(ValidationError::ChecksFailed { count: blocking }));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::vcs::runner::fake::FakeRunner;
  use crate::testing::{monorepo, write};
  use std::sync::Arc;

  #[test]
  fn test_check_fails_on_version_drift() {
    let (dir, _) = monorepo();
    let runner = Arc::new(FakeRunner::new().fail("--show-toplevel", "fatal"));
    let ctx = AppContext::build(dir.path(), runner.clone()).unwrap();
    run_check(&ctx, true).unwrap();

    write(dir.path(), "a/src/pkg_a/__init__.py", "__version__ = \"9.9.9\"\n");
    let err = run_check(&ctx, false).unwrap_err();
    assert!(matches!(err, RailError::Validation(ValidationError::ChecksFailed { .. })));
  }
}
