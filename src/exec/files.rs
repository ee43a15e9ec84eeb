// src/exec/files.rs

//! The `clean` and `html` actions.

use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::FileSystem;

/// Remove the output directory and everything in it.
pub fn clean(fs: &dyn FileSystem, dist: &Path) -> Result<()> {
    info!(dist = ?dist, "removing output directory");
    fs.remove_dir_all(dist)?;
    Ok(())
}

/// Copy the markup file into `dist`, keeping its file name.
///
/// With `reload_port` set, the live-reload client snippet is injected
/// before `</body>`.
pub fn copy_markup(
    fs: &dyn FileSystem,
    source: &Path,
    dist: &Path,
    reload_port: Option<u16>,
) -> Result<()> {
    let file_name = source
        .file_name()
        .with_context(|| format!("markup source {:?} has no file name", source))?;
    let target = dist.join(file_name);

    let mut html = fs.read_to_string(source)?;
    if let Some(port) = reload_port {
        html = inject_reload_snippet(&html, port);
        debug!(port, "injected reload client");
    }

    fs.write(&target, html.as_bytes())?;
    info!(from = ?source, to = ?target, "copied markup");
    Ok(())
}

/// Client that listens on the reload channel: `css` refreshes stylesheets,
/// anything else reloads the page.
pub fn reload_snippet(port: u16) -> String {
    format!(
        r#"<script>
(function () {{
    const socket = new WebSocket("ws://" + (location.hostname || "localhost") + ":{port}");
    socket.addEventListener("message", event => {{
        if (event.data === "css") {{
            document.querySelectorAll('link[rel="stylesheet"]').forEach(link => {{
                const url = new URL(link.href);
                url.searchParams.set("buildloop", Date.now());
                link.href = url.toString();
            }});
        }} else {{
            window.location.reload();
        }}
    }});
}})();
</script>
"#
    )
}

/// Insert the reload client before the last `</body>`, or append it when
/// the document has none.
pub fn inject_reload_snippet(html: &str, port: u16) -> String {
    let snippet = reload_snippet(port);
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + snippet.len());
            out.push_str(&html[..idx]);
            out.push_str(&snippet);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{snippet}"),
    }
}
