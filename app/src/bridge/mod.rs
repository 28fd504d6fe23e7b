mod session;

pub use session::SessionTracker;

use crate::adapter::relay::{RelayConnection, RelayError};
use crate::dimmer::{DeviceApi, DimmerError, LevelController};
use crate::x10::{self, AddressAction, HouseCode, LevelAction, ParsedEvent, RejectReason, UnitId};

/// What processing a single relay line amounted to.
#[derive(Debug)]
pub enum LineOutcome {
    Ignored(RejectReason),
    Addressed(UnitId, AddressAction),
    NoUnitAddressed(LevelAction),
    LevelChanged { unit: UnitId, level: u8 },
    Failed(DimmerError),
}

pub struct Bridge<A: DeviceApi> {
    house: HouseCode,
    magnitude: u8,
    session: SessionTracker,
    controller: LevelController<A>,
}

impl<A: DeviceApi> Bridge<A> {
    pub fn new(house: HouseCode, magnitude: u8, controller: LevelController<A>) -> Self {
        Self {
            house,
            magnitude,
            session: SessionTracker::new(),
            controller,
        }
    }

    /// Processes lines until the relay connection fails. Per-line failures are logged and never
    /// end the loop.
    pub async fn run(&mut self, connection: &mut RelayConnection) -> RelayError {
        loop {
            match connection.next_line().await {
                Ok(line) => {
                    self.process_line(&line).await;
                }
                Err(e) => return e,
            }
        }
    }

    pub async fn process_line(&mut self, line: &str) -> LineOutcome {
        match x10::parse(line, self.house) {
            ParsedEvent::Rejected { reason } => {
                tracing::debug!("Ignoring packet {:?}: {}", line, reason);
                LineOutcome::Ignored(reason)
            }
            ParsedEvent::AddressUnit { unit, action } => {
                self.session.on_address_event(unit);
                tracing::debug!("Unit {}{} addressed ({})", self.house, unit, action);
                LineOutcome::Addressed(unit, action)
            }
            ParsedEvent::LevelChange { action } => self.change_level(action).await,
        }
    }

    async fn change_level(&self, action: LevelAction) -> LineOutcome {
        let Some(unit) = self.session.current() else {
            tracing::info!("{} received before any unit of house {} was addressed", action, self.house);
            return LineOutcome::NoUnitAddressed(action);
        };

        match self.controller.apply(unit, action, self.magnitude).await {
            Ok(level) => {
                tracing::info!("{} {}{}: level now {}", action, self.house, unit, level);
                LineOutcome::LevelChanged { unit, level }
            }
            Err(e) => {
                match &e {
                    DimmerError::NoMapping(_) => tracing::warn!("{} {}{} ignored: {}", action, self.house, unit, e),
                    _ => tracing::error!("{} {}{} failed: {}", action, self.house, unit, e),
                }
                LineOutcome::Failed(e)
            }
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &SessionTracker {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::adapter::relay::Relay;
    use crate::dimmer::fake::{FakeDeviceApi, Request, dimmer};
    use crate::dimmer::{DeviceIdx, DeviceStatus, UnsupportedReason};

    const IDX: DeviceIdx = DeviceIdx(17);
    const ADDRESS_J3_ON: &str = "02/20 18:53:40 Rx RF HouseUnit: J3 Func: On";
    const BRIGHT: &str = "02/20 19:13:08 Rx RF House: J Func: Bright";
    const DIM: &str = "02/20 19:13:08 Rx RF House: J Func: Dim";

    fn unit(n: u8) -> UnitId {
        UnitId::new(n).unwrap()
    }

    fn bridge(api: &FakeDeviceApi) -> Bridge<FakeDeviceApi> {
        let controller = LevelController::new(api.clone(), HashMap::from([(unit(3), IDX)]));
        Bridge::new(HouseCode::new('J').unwrap(), 15, controller)
    }

    #[tokio::test]
    async fn level_change_without_addressed_unit_is_a_noop() {
        let api = FakeDeviceApi::with_level(40);
        let mut bridge = bridge(&api);

        let outcome = bridge.process_line(BRIGHT).await;

        assert!(matches!(outcome, LineOutcome::NoUnitAddressed(LevelAction::Bright)));
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn address_then_bright() {
        let api = FakeDeviceApi::with_level(40);
        let mut bridge = bridge(&api);

        let addressed = bridge.process_line(ADDRESS_J3_ON).await;
        let outcome = bridge.process_line(BRIGHT).await;

        assert!(matches!(addressed, LineOutcome::Addressed(u, AddressAction::On) if u == unit(3)));
        assert!(matches!(outcome, LineOutcome::LevelChanged { level: 55, .. }));
        assert_eq!(api.requests(), vec![Request::Status(IDX), Request::SetLevel(IDX, 55)]);
    }

    #[tokio::test]
    async fn address_then_dim_to_off() {
        let api = FakeDeviceApi::with_level(12);
        let mut bridge = bridge(&api);

        bridge.process_line(ADDRESS_J3_ON).await;
        let outcome = bridge.process_line(DIM).await;

        assert!(matches!(outcome, LineOutcome::LevelChanged { level: 0, .. }));
        assert_eq!(api.writes(), vec![Request::SetLevel(IDX, 1), Request::SwitchOff(IDX)]);
    }

    #[tokio::test]
    async fn off_packet_also_addresses_unit() {
        let api = FakeDeviceApi::with_level(40);
        let mut bridge = bridge(&api);

        bridge.process_line("02/20 18:53:40 Rx RF HouseUnit: J3 Func: Off").await;
        let outcome = bridge.process_line(DIM).await;

        assert!(matches!(outcome, LineOutcome::LevelChanged { level: 25, .. }));
    }

    #[tokio::test]
    async fn unmapped_unit_is_tracked_but_not_dimmed() {
        let api = FakeDeviceApi::with_level(40);
        let mut bridge = bridge(&api);

        bridge.process_line("02/20 18:53:40 Rx RF HouseUnit: J9 Func: On").await;
        assert_eq!(bridge.session().current(), Some(unit(9)));

        let outcome = bridge.process_line(DIM).await;

        assert!(matches!(outcome, LineOutcome::Failed(DimmerError::NoMapping(_))));
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn unsupported_device_is_not_written() {
        let api = FakeDeviceApi {
            status: Some(DeviceStatus {
                switch_type: Some("On/Off".to_owned()),
                ..dimmer(40)
            }),
            ..Default::default()
        };
        let mut bridge = bridge(&api);

        bridge.process_line(ADDRESS_J3_ON).await;
        let outcome = bridge.process_line(BRIGHT).await;

        assert!(matches!(
            outcome,
            LineOutcome::Failed(DimmerError::UnsupportedDevice {
                reason: UnsupportedReason::NotADimmer(_),
                ..
            })
        ));
        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn other_house_does_not_touch_session() {
        let api = FakeDeviceApi::with_level(40);
        let mut bridge = bridge(&api);

        bridge.process_line(ADDRESS_J3_ON).await;
        let outcome = bridge.process_line("02/20 18:53:40 Rx RF HouseUnit: A5 Func: On").await;

        assert!(matches!(outcome, LineOutcome::Ignored(RejectReason::HouseNotMonitored)));
        assert_eq!(bridge.session().current(), Some(unit(3)));
    }

    #[tokio::test]
    async fn repeated_address_keeps_session() {
        let api = FakeDeviceApi::with_level(40);
        let mut bridge = bridge(&api);

        bridge.process_line(ADDRESS_J3_ON).await;
        bridge.process_line(ADDRESS_J3_ON).await;

        assert_eq!(bridge.session().current(), Some(unit(3)));
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_keeps_processing() {
        let api = FakeDeviceApi {
            fail_status: true,
            ..FakeDeviceApi::with_level(40)
        };
        let mut bridge = bridge(&api);

        bridge.process_line(ADDRESS_J3_ON).await;
        let first = bridge.process_line(BRIGHT).await;
        let second = bridge.process_line(BRIGHT).await;

        assert!(matches!(first, LineOutcome::Failed(DimmerError::Transport { .. })));
        assert!(matches!(second, LineOutcome::Failed(DimmerError::Transport { .. })));
        assert_eq!(api.requests(), vec![Request::Status(IDX), Request::Status(IDX)]);
    }

    #[tokio::test]
    async fn runs_over_relay_until_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let relay = Relay {
            host: "127.0.0.1".to_owned(),
            port: listener.local_addr().unwrap().port(),
            connect_timeout_secs: 5,
        };

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let packets = format!("garbage\n{}\n{}\n", ADDRESS_J3_ON, BRIGHT);
            socket.write_all(packets.as_bytes()).await.unwrap();
        });

        let api = FakeDeviceApi::with_level(40);
        let mut bridge = bridge(&api);
        let mut connection = relay.connect().await.unwrap();

        let reason = bridge.run(&mut connection).await;
        server.await.unwrap();

        assert!(matches!(reason, RelayError::Closed));
        assert_eq!(api.requests(), vec![Request::Status(IDX), Request::SetLevel(IDX, 55)]);
    }
}
