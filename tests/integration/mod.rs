//! End-to-end tests running the `pyrail` binary against temporary git repositories

mod helpers;
mod test_changelog;
mod test_check;
mod test_release;
