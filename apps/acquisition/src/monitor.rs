use hb_event_bus::{EventBus, EventReceiverExt};
use hb_telemetry::{FrameReceived, LedColor};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Warns once when no frame arrived for `stale_after`, and again logs when they resume.
pub(crate) async fn watch_frames(events: EventBus, stale_after: Duration, token: CancellationToken) {
    let mut rx = match events.subscribe::<FrameReceived>() {
        Ok(rx) => rx,
        Err(e) => {
            warn!(error = %e, "Frame monitor disabled");
            return;
        },
    };

    let mut stale = false;
    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => break,
            next = tokio::time::timeout(stale_after, EventReceiverExt::recv(&mut rx)) => next,
        };

        match next {
            Ok(Some(event)) => {
                if stale {
                    info!(timestamp = ?event.frame.timestamp(), "Frames resumed");
                    stale = false;
                }
            },
            Ok(None) => break,
            Err(_) if !stale => {
                warn!(silent_for = ?stale_after, "No frames received from the MCU");
                stale = true;
            },
            Err(_) => {},
        }
    }

    debug!("Frame monitor stopped");
}

/// Mirrors status LED changes into the log for nodes whose LED is out of sight.
/// Returns how many changes it saw.
pub(crate) async fn follow_led(events: EventBus, token: CancellationToken) -> usize {
    let mut rx = match events.subscribe_watch(LedColor::Off) {
        Ok(rx) => rx,
        Err(e) => {
            warn!(error = %e, "LED log disabled");
            return 0;
        },
    };

    let mut changes = 0;
    loop {
        let color = tokio::select! {
            biased;
            () = token.cancelled() => break,
            color = EventReceiverExt::recv(&mut rx) => color,
        };
        let Some(color) = color else { break };
        changes += 1;
        debug!(%color, "Status LED");
    }
    changes
}
