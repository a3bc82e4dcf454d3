use care_reminder_domain::{Device, Notification};
use care_reminder_infra::IPushNotifier;
use futures::future::join_all;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
}

/// Sends `notification` to every device. Failures are logged per device
/// and never abort the fan-out, a user without devices receives nothing.
pub async fn dispatch_to_devices(
    devices: &[Device],
    notification: &Notification,
    push: &dyn IPushNotifier,
) -> DispatchReport {
    let results = join_all(
        devices
            .iter()
            .map(|device| push.send(&device.token, notification)),
    )
    .await;

    let mut delivered = 0;
    for (device, res) in devices.iter().zip(results) {
        match res {
            Ok(delivery_id) => {
                delivered += 1;
                info!(
                    device_id = %device.id,
                    device_token = %device.token,
                    delivery_id = %delivery_id,
                    "Push notification sent"
                );
            }
            Err(e) => error!(
                device_id = %device.id,
                device_token = %device.token,
                "Unable to send push notification. Error: {}",
                e
            ),
        }
    }

    DispatchReport {
        attempted: devices.len(),
        delivered,
    }
}
