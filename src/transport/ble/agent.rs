//! Pairing agent bridging BlueZ pairing requests to radio events

use bluer::agent::{
    Agent, DisplayPasskeyFn, ReqError, RequestConfirmation, RequestConfirmationFn,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    core::types::{IoCapability, PairingEvent},
    transport::ble::RadioEvent,
};

/// How long a numeric comparison waits for the application's answer
const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Answer channel of the numeric comparison currently shown to the user
pub type ConfirmationSlot = Arc<Mutex<Option<oneshot::Sender<bool>>>>;

/// Which agent callbacks the I/O capability implies
fn agent_callbacks(io: IoCapability) -> (bool, bool) {
    // (display passkey, confirm numeric comparison)
    match io {
        IoCapability::DisplayOnly => (true, false),
        IoCapability::DisplayYesNo => (true, true),
        IoCapability::NoInputNoOutput => (false, false),
        IoCapability::KeyboardOnly | IoCapability::KeyboardDisplay => {
            warn!(?io, "Passkey entry unsupported, falling back to display");
            (true, true)
        }
    }
}

/// Build the agent registered with the BlueZ session
pub fn build_agent(
    io: IoCapability,
    events: mpsc::UnboundedSender<RadioEvent>,
    confirmation: ConfirmationSlot,
) -> Agent {
    let (display, confirm) = agent_callbacks(io);

    let display_passkey = display.then(|| {
        let events = events.clone();
        let fun: DisplayPasskeyFn = Box::new(move |req| {
            let events = events.clone();
            Box::pin(async move {
                debug!("Displaying passkey for {}", req.device);
                let _ = events.send(RadioEvent::Pairing(PairingEvent::Started));
                events
                    .send(RadioEvent::PasskeyDisplay(req.passkey))
                    .map_err(|_| ReqError::Canceled)
            })
        });
        fun
    });

    let request_confirmation = confirm.then(|| {
        let fun: RequestConfirmationFn = Box::new(move |req| {
            let events = events.clone();
            let confirmation = confirmation.clone();
            Box::pin(async move { confirm_passkey(events, confirmation, req).await })
        });
        fun
    });

    Agent {
        request_default: true,
        display_passkey,
        request_confirmation,
        ..Default::default()
    }
}

async fn confirm_passkey(
    events: mpsc::UnboundedSender<RadioEvent>,
    confirmation: ConfirmationSlot,
    req: RequestConfirmation,
) -> Result<(), ReqError> {
    info!("Numeric comparison requested by {}", req.device);

    let (answer_tx, answer_rx) = oneshot::channel();
    *confirmation.lock().await = Some(answer_tx);

    let _ = events.send(RadioEvent::Pairing(PairingEvent::Started));
    if events
        .send(RadioEvent::NumericComparison(req.passkey))
        .is_err()
    {
        return Err(ReqError::Canceled);
    }

    match tokio::time::timeout(CONFIRMATION_TIMEOUT, answer_rx).await {
        Ok(Ok(true)) => Ok(()),
        outcome => {
            if outcome.is_err() {
                warn!("Numeric comparison not answered in time");
            }
            confirmation.lock().await.take();
            let _ = events.send(RadioEvent::Pairing(PairingEvent::Failed));
            Err(ReqError::Rejected)
        }
    }
}
