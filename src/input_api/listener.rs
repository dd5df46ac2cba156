use std::{
    sync::mpsc::{self, RecvTimeoutError},
    time::Duration,
};

use anyhow::{anyhow, Result};
use rdev::{listen, EventType};
use tracing::{error, info};

use super::{InputCallback, InputEvent, InputHook};

/// Time given to the listener thread to report a failed hook installation.
const STARTUP_GRACE: Duration = Duration::from_millis(500);

fn to_input_event(event: &EventType) -> Option<InputEvent> {
    match event {
        EventType::KeyPress(_) => Some(InputEvent::KeyPress),
        EventType::ButtonPress(_) => Some(InputEvent::MouseClick),
        EventType::MouseMove { .. } => Some(InputEvent::MouseMove),
        _ => None,
    }
}

/// rdev based hook. `listen` blocks forever, so it gets its own thread.
#[derive(Default)]
pub struct ListenerInputHook {
    started: bool,
}

impl InputHook for ListenerInputHook {
    fn start(&mut self, callback: InputCallback) -> Result<()> {
        if self.started {
            return Err(anyhow!("Input hook already started"));
        }

        let (error_sender, error_receiver) = mpsc::channel();
        std::thread::Builder::new()
            .name("input-hook".into())
            .spawn(move || {
                let result = listen(move |event| {
                    if let Some(input) = to_input_event(&event.event_type) {
                        callback(input);
                    }
                });
                if let Err(e) = result {
                    error!("Input listener stopped: {e:?}");
                    let _ = error_sender.send(format!("{e:?}"));
                }
            })?;

        match error_receiver.recv_timeout(STARTUP_GRACE) {
            Ok(e) => Err(anyhow!("Failed to install input hooks: {e}")),
            Err(RecvTimeoutError::Timeout) => {
                info!("Input hooks installed");
                self.started = true;
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(anyhow!("Input listener exited during startup"))
            }
        }
    }
}
