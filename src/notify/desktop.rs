use std::{
    io::Write,
    process::{Command, Stdio},
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, instrument};

use super::Notifier;

/// Notifier backed by what the desktop offers: toasts and PowerShell on Windows, `notify-send`
/// and `wl-copy`/`xclip` elsewhere.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

/// Runs `program` feeding `input` through stdin and waits for it.
fn pipe_to(program: &str, args: &[&str], input: &str) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("{program} has no stdin"))?;
    stdin.write_all(input.as_bytes())?;
    drop(stdin);

    let status = child.wait()?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }
    Ok(())
}

impl Notifier for DesktopNotifier {
    #[instrument(skip(self, body))]
    fn show_message(&self, title: &str, body: &str, duration: Duration) -> Result<()> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win_toast_notify::{Duration as ToastDuration, WinToastNotify};

                let toast_duration = if duration > Duration::from_secs(7) {
                    ToastDuration::Long
                } else {
                    ToastDuration::Short
                };
                let lines = body.lines().collect::<Vec<_>>();
                let _ = WinToastNotify::new()
                    .set_duration(toast_duration)
                    .set_title(title)
                    .set_messages(lines)
                    .show();
                Ok(())
            } else {
                let status = Command::new("notify-send")
                    .arg("--app-name=dayreview")
                    .arg(format!("--expire-time={}", duration.as_millis()))
                    .arg(title)
                    .arg(body)
                    .status()
                    .context("failed to run notify-send")?;
                if !status.success() {
                    bail!("notify-send exited with {status}");
                }
                Ok(())
            }
        }
    }

    #[instrument(skip_all)]
    fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        if cfg!(windows) {
            return pipe_to(
                "powershell",
                &[
                    "-NoProfile",
                    "-Command",
                    "[Console]::InputEncoding = [Text.Encoding]::UTF8; Set-Clipboard -Value ([Console]::In.ReadToEnd())",
                ],
                text,
            );
        }

        let wayland = pipe_to("wl-copy", &[], text);
        match wayland {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("wl-copy failed, trying xclip: {e:?}");
                pipe_to("xclip", &["-selection", "clipboard"], text)
            }
        }
    }

    #[instrument(skip(self))]
    fn launch_application(&self, name: &str) -> Result<()> {
        let mut command = if cfg!(windows) {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", "", name]);
            command
        } else if name.contains("://") {
            let mut command = Command::new("xdg-open");
            command.arg(name);
            command
        } else {
            Command::new(name)
        };

        #[allow(clippy::zombie_processes)]
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to launch {name}"))?;
        Ok(())
    }
}
