//! Console presenter for the device-code prompt
//!
//! Prints the provider's instructions, copies the user code to the clipboard
//! and opens the verification page. Clipboard and browser are optional and
//! only logged when unavailable.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use refsync_core::VerificationPresenter;
use refsync_domain::DeviceCode;
use tracing::{debug, warn};

/// Presenter writing to stderr with optional clipboard and browser effects.
#[derive(Debug, Clone, Copy)]
pub struct SystemPresenter {
    copy_code: bool,
    open_browser: bool,
}

impl Default for SystemPresenter {
    fn default() -> Self {
        Self { copy_code: true, open_browser: true }
    }
}

impl SystemPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print only; no clipboard or browser.
    pub const fn quiet() -> Self {
        Self { copy_code: false, open_browser: false }
    }

    #[must_use]
    pub const fn with_clipboard(mut self, enabled: bool) -> Self {
        self.copy_code = enabled;
        self
    }

    #[must_use]
    pub const fn with_browser(mut self, enabled: bool) -> Self {
        self.open_browser = enabled;
        self
    }
}

impl VerificationPresenter for SystemPresenter {
    fn present(&self, code: &DeviceCode) {
        let mut stderr = io::stderr().lock();
        if let Err(err) = writeln!(stderr, "{}", code.instructions()) {
            warn!(error = %err, "Failed to print device-code instructions");
        }

        if self.copy_code {
            match copy_to_clipboard(&code.user_code) {
                Ok(()) => debug!("User code copied to clipboard"),
                Err(err) => warn!(error = %err, "Could not copy user code to clipboard"),
            }
        }

        if self.open_browser {
            match open_browser(&code.verification_uri) {
                Ok(()) => debug!(url = %code.verification_uri, "Opened verification page"),
                Err(err) => warn!(error = %err, "Could not open verification page"),
            }
        }
    }
}

fn open_browser(url: &str) -> io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(url).spawn()?;
        return Ok(());
    }

    #[cfg(target_os = "windows")]
    {
        Command::new("rundll32.exe").args(["url.dll,FileProtocolHandler", url]).spawn()?;
        return Ok(());
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Command::new("xdg-open").arg(url).stdout(Stdio::null()).stderr(Stdio::null()).spawn()?;
        return Ok(());
    }

    #[allow(unreachable_code)]
    Err(io::Error::new(io::ErrorKind::Unsupported, "no browser launcher for this platform"))
}

fn clipboard_commands() -> &'static [(&'static str, &'static [&'static str])] {
    if cfg!(target_os = "macos") {
        &[("pbcopy", &[])]
    } else if cfg!(target_os = "windows") {
        &[("clip", &[])]
    } else {
        &[("wl-copy", &[]), ("xclip", &["-selection", "clipboard"]), ("xsel", &["--clipboard", "--input"])]
    }
}

fn copy_to_clipboard(text: &str) -> io::Result<()> {
    let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no clipboard utility found");

    for (program, args) in clipboard_commands() {
        match pipe_into(program, args, text) {
            Ok(()) => return Ok(()),
            Err(err) => last_error = err,
        }
    }
    Err(last_error)
}

fn pipe_into(program: &str, args: &[&str], text: &str) -> io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }

    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{program} exited with {status}")))
    }
}
