use std::ffi::OsStr;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

pub trait HideWindow {
    fn hide_window(&mut self) -> &mut Self;
}

impl HideWindow for tokio::process::Command {
    #[cfg(windows)]
    fn hide_window(&mut self) -> &mut Self {
        self.creation_flags(CREATE_NO_WINDOW)
    }

    #[cfg(not(windows))]
    fn hide_window(&mut self) -> &mut Self {
        self
    }
}

/// Non-interactive command for a package-manager tool: no console window,
/// no colour codes or progress bars in the output, and the child is killed
/// when the returned command (or its pending output future) is dropped.
pub fn tool_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.env("NO_COLOR", "1")
        .env("FORCE_COLOR", "0")
        .env("CI", "1")
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);
    cmd.hide_window();
    cmd
}

#[cfg(test)]
mod tests {
    use super::{HideWindow, tool_command};

    #[test]
    fn tokio_command_hide_window_is_chainable() {
        let mut cmd = tokio::process::Command::new("echo");
        let before = &mut cmd as *mut tokio::process::Command;
        let after = cmd.hide_window() as *mut tokio::process::Command;
        assert_eq!(before, after);
    }

    #[test]
    fn tool_command_disables_colour_output() {
        let cmd = tool_command("npm");
        let envs: Vec<_> = cmd
            .as_std()
            .get_envs()
            .filter_map(|(key, value)| Some((key.to_str()?, value?.to_str()?)))
            .collect();

        assert!(envs.contains(&("NO_COLOR", "1")));
        assert!(envs.contains(&("FORCE_COLOR", "0")));
        assert_eq!(cmd.as_std().get_program(), "npm");
    }
}
