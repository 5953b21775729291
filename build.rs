use anyhow::Result;
use vergen::EmitBuilder;

// The CLI reports VERGEN_GIT_SHA / VERGEN_BUILD_DATE in its long version.
fn main() -> Result<()> {
    EmitBuilder::builder()
        .build_date()
        .git_sha(true)
        .git_commit_date()
        .emit()?;
    Ok(())
}
