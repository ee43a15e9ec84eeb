use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use buildloop::bundle::{BundleRequest, ScriptBundler};
use buildloop::errors::{BuildloopError, Result};

/// Stand-in for the external bundler.
///
/// Writes a metafile listing `inputs` (plus an empty outfile), or fails
/// with a `BundleError` while `fail` is set.
#[derive(Debug, Clone, Default)]
pub struct FakeBundler {
    inputs: Vec<String>,
    fail: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FakeBundler {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let bundler = Self::default();
        bundler.set_failing(true);
        bundler
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn metafile_json(&self) -> String {
        let inputs: serde_json::Map<String, serde_json::Value> = self
            .inputs
            .iter()
            .map(|p| (p.clone(), serde_json::json!({ "bytes": 0, "imports": [] })))
            .collect();
        serde_json::json!({ "inputs": inputs, "outputs": {} }).to_string()
    }
}

impl ScriptBundler for FakeBundler {
    fn bundle<'a>(
        &'a self,
        request: &'a BundleRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(BuildloopError::BundleError(
                    "Could not resolve \"./missing\"".to_string(),
                ));
            }

            let outfile = request.root.join(&request.outfile);
            let metafile = request.root.join(&request.metafile);
            for path in [&outfile, &metafile] {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&outfile, b"")?;
            std::fs::write(&metafile, self.metafile_json())?;
            Ok(())
        })
    }
}
