use std::time::Duration;

use crate::config::ClientConfig;
use crate::map::TileMap;
use crate::net::{
    ClientMessage, DatagramChannel, MAX_NAME_LEN, PacketError, PlayerId, Reliability,
    ReliableHandle, ServerMessage, Session,
};
use crate::player::{PlayerRegistry, PlayerState};
use crate::shot::ShotTracker;

use super::clock::Clock;
use super::input::InputSample;
use super::lifecycle::{ConnectionState, DisconnectOutcome, Lifecycle};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// The (name, local port) pair this client registers with. The port tells
/// apart two players with the same display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub name: String,
    pub port: u16,
}

/// Per-tick orchestrator keeping the local view of the world in sync with
/// the server.
///
/// Each tick drains and applies every inbound packet before making any
/// outbound decision, so local prediction always sees the freshest state.
pub struct SyncEngine<C: DatagramChannel> {
    session: Session<C>,
    registry: PlayerRegistry,
    shots: ShotTracker,
    lifecycle: Lifecycle,
    identity: LocalIdentity,
    current_player: Option<PlayerId>,
    registration_attempted: bool,
    pending_connect: Option<ReliableHandle>,
    pending_shot: Option<ReliableHandle>,
    disconnect_timeout: Duration,
}

impl<C: DatagramChannel> SyncEngine<C> {
    pub fn new(
        mut session: Session<C>,
        name: impl Into<String>,
        config: &ClientConfig,
    ) -> Result<Self, PacketError> {
        let name = name.into();
        if name.len() > MAX_NAME_LEN {
            return Err(PacketError::StringTooLong(name.len()));
        }
        session.set_packet_loss(config.packet_loss.clone());

        let identity = LocalIdentity {
            name,
            port: session.local_port(),
        };

        Ok(Self {
            session,
            registry: PlayerRegistry::new(),
            shots: ShotTracker::new(config.shot.clone()),
            lifecycle: Lifecycle::new(),
            identity,
            current_player: None,
            registration_attempted: false,
            pending_connect: None,
            pending_shot: None,
            disconnect_timeout: config.disconnect_timeout(),
        })
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.current_player
    }

    pub fn local_player(&self) -> Option<&PlayerState> {
        self.current_player.and_then(|id| self.registry.get(id))
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    pub fn connecting_elapsed(&self) -> Option<Duration> {
        self.lifecycle.connecting_elapsed()
    }

    pub fn shots(&self) -> &ShotTracker {
        &self.shots
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }

    /// One frame: drain and apply, predict, register, flush.
    pub fn tick<M: TileMap + ?Sized>(
        &mut self,
        elapsed: Duration,
        input: &InputSample,
        map: &mut M,
    ) {
        self.drain_inbound(map);
        self.shots.advance(&mut self.registry, elapsed.as_secs_f64());

        if let Some(id) = self.registered_player() {
            self.predict(id, input, elapsed);
        } else if !self.registration_attempted {
            self.register();
        }

        self.lifecycle.advance(elapsed);
        self.session.flush();
    }

    /// Applies one decoded server event to local state.
    pub fn apply<M: TileMap + ?Sized>(&mut self, message: ServerMessage, map: &mut M) {
        log::trace!("{:?} for player {}", message.tag(), message.player_id());
        match message {
            ServerMessage::Connect { id, name, port } => {
                if self.current_player.is_none()
                    && name == self.identity.name
                    && port == self.identity.port
                {
                    self.bind(id);
                }
                if !self.registry.insert_if_absent(id, &name) {
                    log::trace!("Duplicate CONNECT for player {}", id);
                }
            }
            ServerMessage::Update {
                id,
                direction,
                position,
                hover,
            } => match self.registry.get_mut(id) {
                Some(player) => player.apply_update(direction, position, hover),
                None => log::trace!("UPDATE for unknown player {}", id),
            },
            ServerMessage::Death { id } => match self.registry.get_mut(id) {
                Some(player) => {
                    log::debug!("Player {} died", id);
                    player.is_dead = true;
                }
                None => log::trace!("DEATH for unknown player {}", id),
            },
            ServerMessage::Disconnect { id } => {
                if self.registry.remove(id).is_some() {
                    log::debug!("Player {} left", id);
                }
                if Some(id) == self.current_player {
                    log::warn!("Server removed the local player {}", id);
                }
            }
            ServerMessage::Shot(fired) => {
                self.shots.on_shot(&mut self.registry, &fired);
                if Some(fired.id) == self.current_player {
                    self.confirm_shot();
                }
            }
            ServerMessage::TileDamaged { x, y, id } => {
                self.shots.on_tile_damaged(&mut self.registry, map, x, y, id);
                if Some(id) == self.current_player {
                    // The SHOT echo may have been lost; the damage proves the
                    // server processed the shot either way.
                    self.confirm_shot();
                }
            }
        }
    }

    /// Runs the bounded disconnect drain and tears the session down.
    ///
    /// Resolves on whichever comes first: the server's DISCONNECT echo for
    /// the local player, or the configured timeout.
    pub fn shutdown(mut self, clock: &impl Clock) -> DisconnectOutcome {
        if let Some(handle) = self.pending_shot.take() {
            self.session.abandon(handle);
        }

        let Some(id) = self.current_player else {
            if let Some(handle) = self.pending_connect.take() {
                self.session.abandon(handle);
            }
            self.lifecycle.finish(DisconnectOutcome::NotConnected);
            return DisconnectOutcome::NotConnected;
        };

        self.lifecycle.begin_disconnect(id);
        let handle = match (ClientMessage::Disconnect { id }).encode() {
            Ok(bytes) => self.session.send(bytes, Reliability::Reliable),
            Err(e) => {
                log::warn!("Failed to encode DISCONNECT: {}", e);
                None
            }
        };

        let deadline = clock.now() + self.disconnect_timeout;
        let outcome = loop {
            self.session.flush();
            if self.poll_disconnect_echo(id) {
                break DisconnectOutcome::Acknowledged;
            }

            let now = clock.now();
            if now >= deadline {
                break DisconnectOutcome::TimedOut;
            }
            clock.sleep(DRAIN_POLL_INTERVAL.min(deadline - now));
        };

        if let Some(handle) = handle {
            match outcome {
                DisconnectOutcome::Acknowledged => self.session.acknowledge(handle),
                _ => self.session.abandon(handle),
            };
        }
        self.lifecycle.finish(outcome);
        outcome
    }

    fn registered_player(&self) -> Option<PlayerId> {
        self.current_player.filter(|&id| self.registry.contains(id))
    }

    fn drain_inbound<M: TileMap + ?Sized>(&mut self, map: &mut M) {
        for packet in self.session.poll_incoming() {
            match ServerMessage::decode(&packet) {
                Ok(Some(message)) => self.apply(message, map),
                Ok(None) => log::trace!("Discarding packet with unknown tag {:?}", packet.first()),
                Err(e) => {
                    log::debug!("Discarding malformed packet: {}", e);
                    self.session.record_decode_error();
                }
            }
        }
    }

    fn poll_disconnect_echo(&mut self, id: PlayerId) -> bool {
        let mut echoed = false;
        for packet in self.session.poll_incoming() {
            if let Ok(Some(ServerMessage::Disconnect { id: echoed_id })) =
                ServerMessage::decode(&packet)
            {
                if echoed_id == id {
                    echoed = true;
                }
            }
        }
        echoed
    }

    fn bind(&mut self, id: PlayerId) {
        self.current_player = Some(id);
        if let Some(handle) = self.pending_connect.take() {
            self.session.acknowledge(handle);
        }
        self.lifecycle.bind(id);
    }

    fn confirm_shot(&mut self) {
        if let Some(handle) = self.pending_shot.take() {
            self.session.acknowledge(handle);
        }
    }

    fn register(&mut self) {
        self.registration_attempted = true;
        let message = ClientMessage::Connect {
            name: self.identity.name.clone(),
            port: self.identity.port,
        };
        match message.encode() {
            Ok(bytes) => {
                self.lifecycle
                    .begin_connect(&self.identity.name, self.identity.port);
                self.pending_connect = self.session.send(bytes, Reliability::Reliable);
            }
            Err(e) => log::warn!("Failed to encode CONNECT: {}", e),
        }
    }

    fn predict(&mut self, id: PlayerId, input: &InputSample, elapsed: Duration) {
        let snapshot = input.snapshot();
        if let Some(player) = self.registry.get_mut(id) {
            if player.last_input != snapshot {
                match (ClientMessage::Update { id, input: snapshot }).encode() {
                    Ok(bytes) => {
                        self.session.send(bytes, Reliability::Unreliable);
                        player.last_input = snapshot;
                    }
                    Err(e) => log::warn!("Failed to encode UPDATE: {}", e),
                }
            }
        }

        // Losing focus mid-charge drops the charge instead of releasing it.
        if !input.focused {
            self.shots.cancel_charge();
            return;
        }
        let Some(distance) = self
            .shots
            .update_charge(input.fire, elapsed.as_secs_f64())
        else {
            return;
        };
        let Some(fired) = self.shots.try_fire(&mut self.registry, id, distance) else {
            return;
        };

        match ClientMessage::Shot(fired).encode() {
            Ok(bytes) => {
                log::debug!("Firing shot, distance {:.1}", distance);
                if let Some(stale) = self.pending_shot.take() {
                    self.session.abandon(stale);
                }
                self.pending_shot = self.session.send(bytes, Reliability::Reliable);
            }
            Err(e) => {
                log::warn!("Failed to encode SHOT: {}", e);
                if let Some(player) = self.registry.get_mut(id) {
                    player.shot_allowed = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::HexMap;
    use crate::net::{InputSnapshot, Keys, LoopbackChannel, ShotFired};
    use crate::sync::ManualClock;
    use glam::DVec2;

    const LOCAL_PORT: u16 = 5001;

    struct Harness {
        engine: SyncEngine<LoopbackChannel>,
        server: LoopbackChannel,
        map: HexMap,
    }

    impl Harness {
        fn new(name: &str) -> Self {
            let (client, server) = LoopbackChannel::pair(LOCAL_PORT, 59243);
            let engine =
                SyncEngine::new(Session::new(client), name, &ClientConfig::default()).unwrap();
            Self {
                engine,
                server,
                map: HexMap::new(8, 8),
            }
        }

        fn tick(&mut self, input: InputSample) {
            self.engine
                .tick(Duration::from_millis(5), &input, &mut self.map);
        }

        fn push(&mut self, message: ServerMessage) {
            self.server.send(&message.encode().unwrap()).unwrap();
        }

        fn apply(&mut self, message: ServerMessage) {
            self.engine.apply(message, &mut self.map);
        }

        fn sent(&mut self) -> Vec<ClientMessage> {
            decode_sent(&mut self.server)
        }

        fn connect(&mut self, id: PlayerId, name: &str, port: u16) {
            self.apply(ServerMessage::Connect {
                id,
                name: name.to_string(),
                port,
            });
        }
    }

    fn decode_sent(server: &mut LoopbackChannel) -> Vec<ClientMessage> {
        server
            .recv_all()
            .iter()
            .filter_map(|p| ClientMessage::decode(p).unwrap())
            .collect()
    }

    fn update(id: PlayerId, x: f64, y: f64) -> ServerMessage {
        ServerMessage::Update {
            id,
            direction: 1.57,
            position: DVec2::new(x, y),
            hover: false,
        }
    }

    #[test]
    fn test_first_tick_registers_once() {
        let mut h = Harness::new("Bob");
        h.tick(InputSample::default());

        assert_eq!(h.engine.state(), ConnectionState::Connecting);
        assert_eq!(
            h.sent(),
            vec![ClientMessage::Connect {
                name: "Bob".to_string(),
                port: LOCAL_PORT
            }]
        );

        // The transport keeps retrying; the engine never queues a second copy.
        h.tick(InputSample::default());
        h.tick(InputSample::default());
        assert_eq!(h.sent().len(), 2);
        assert_eq!(h.engine.session().pending_reliable(), 1);
    }

    #[test]
    fn test_matching_connect_binds_and_stops_retry() {
        let mut h = Harness::new("Bob");
        h.tick(InputSample::default());
        h.sent();

        h.push(ServerMessage::Connect {
            id: 2,
            name: "Bob".to_string(),
            port: LOCAL_PORT,
        });
        h.tick(InputSample::default());

        assert_eq!(h.engine.current_player(), Some(2));
        assert_eq!(h.engine.state(), ConnectionState::Connected);
        assert_eq!(h.engine.registry().get(2).unwrap().name, "Bob");
        assert_eq!(h.engine.session().pending_reliable(), 0);
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_same_name_different_port_does_not_bind() {
        let mut h = Harness::new("Alice");
        h.tick(InputSample::default());

        h.connect(7, "Alice", 9999);
        assert_eq!(h.engine.current_player(), None);
        assert!(h.engine.registry().contains(7));

        h.connect(3, "Alice", LOCAL_PORT);
        assert_eq!(h.engine.current_player(), Some(3));

        h.connect(8, "Alice", 4001);
        h.connect(9, "Alice", LOCAL_PORT);
        assert_eq!(h.engine.current_player(), Some(3));
        assert_eq!(h.engine.registry().len(), 4);
    }

    #[test]
    fn test_duplicate_connect_does_not_clobber_update() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);
        h.apply(update(2, 10.0, 20.0));
        h.connect(2, "Bob", LOCAL_PORT);

        assert_eq!(h.engine.registry().len(), 1);
        let player = h.engine.registry().get(2).unwrap();
        assert_eq!(player.position, DVec2::new(10.0, 20.0));
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut h = Harness::new("Bob");
        h.connect(4, "Eve", 1234);

        h.apply(update(4, 3.0, 4.0));
        let once = h.engine.registry().get(4).unwrap().clone();
        h.apply(update(4, 3.0, 4.0));
        assert_eq!(h.engine.registry().get(4).unwrap(), &once);
    }

    #[test]
    fn test_events_for_unknown_player_are_ignored() {
        let mut h = Harness::new("Bob");
        h.apply(update(9, 1.0, 1.0));
        h.apply(ServerMessage::Death { id: 9 });
        h.apply(ServerMessage::Disconnect { id: 9 });
        h.apply(ServerMessage::Shot(ShotFired {
            id: 9,
            origin: DVec2::ZERO,
            direction: 0.0,
            distance: 10.0,
        }));

        assert!(h.engine.registry().is_empty());
    }

    #[test]
    fn test_death_and_disconnect() {
        let mut h = Harness::new("Bob");
        h.connect(4, "Eve", 1234);

        h.apply(ServerMessage::Death { id: 4 });
        assert!(h.engine.registry().get(4).unwrap().is_dead);

        h.apply(ServerMessage::Disconnect { id: 4 });
        assert!(!h.engine.registry().contains(4));
    }

    #[test]
    fn test_unknown_tag_and_garbage_are_dropped() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);
        let before = h.engine.registry().get(2).unwrap().clone();

        h.server.send(&[99, 2, 0, 0]).unwrap();
        h.server.send(&[1, 2]).unwrap();
        h.tick(InputSample::default());

        assert_eq!(h.engine.registry().len(), 1);
        assert_eq!(h.engine.registry().get(2).unwrap(), &before);
        assert_eq!(h.engine.session().stats().decode_errors, 1);
    }

    #[test]
    fn test_input_sent_only_on_change() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);

        let forward = InputSample {
            keys: Keys::W,
            ..Default::default()
        };
        h.tick(forward);
        h.tick(forward);
        h.tick(InputSample::default());

        assert_eq!(
            h.sent(),
            vec![
                ClientMessage::Update {
                    id: 2,
                    input: InputSnapshot::new(Keys::W, 0)
                },
                ClientMessage::Update {
                    id: 2,
                    input: InputSnapshot::default()
                },
            ]
        );
        assert_eq!(
            h.engine.local_player().unwrap().last_input,
            InputSnapshot::default()
        );
    }

    #[test]
    fn test_inbound_applied_before_prediction() {
        let mut h = Harness::new("Bob");
        h.tick(InputSample::default());
        h.sent();

        // Bind and move in the same tick as the first input.
        h.push(ServerMessage::Connect {
            id: 2,
            name: "Bob".to_string(),
            port: LOCAL_PORT,
        });
        h.tick(InputSample {
            keys: Keys::D,
            ..Default::default()
        });

        assert_eq!(
            h.sent(),
            vec![ClientMessage::Update {
                id: 2,
                input: InputSnapshot::new(Keys::D, 0)
            }]
        );
    }

    #[test]
    fn test_shot_lock_scenario() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);
        assert_eq!(h.engine.current_player(), Some(2));

        h.apply(ServerMessage::Update {
            id: 2,
            direction: 1.57,
            position: DVec2::new(10.0, 20.0),
            hover: false,
        });
        let player = h.engine.registry().get(2).unwrap();
        assert_eq!(player.position, DVec2::new(10.0, 20.0));
        assert_eq!(player.direction, 1.57);

        h.apply(ServerMessage::Shot(ShotFired {
            id: 2,
            origin: DVec2::new(10.0, 20.0),
            direction: 1.57,
            distance: 80.0,
        }));
        let player = h.engine.registry().get(2).unwrap();
        assert!(player.shot.is_some());
        assert!(!player.shot_allowed);

        h.apply(ServerMessage::TileDamaged {
            x: 10.0,
            y: 100.0,
            id: 2,
        });
        let player = h.engine.registry().get(2).unwrap();
        assert!(player.shot.is_none());
        assert!(player.shot_allowed);
    }

    #[test]
    fn test_local_fire_takes_optimistic_lock() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);
        h.apply(update(2, 10.0, 20.0));

        let fire = InputSample {
            fire: true,
            ..Default::default()
        };
        h.tick(fire);
        h.tick(fire);
        h.tick(InputSample::default());

        assert!(!h.engine.local_player().unwrap().shot_allowed);
        let shots: Vec<_> = h
            .sent()
            .into_iter()
            .filter(|m| matches!(m, ClientMessage::Shot(_)))
            .collect();
        assert_eq!(shots.len(), 1);
        let ClientMessage::Shot(fired) = &shots[0] else {
            unreachable!()
        };
        assert_eq!(fired.id, 2);
        assert_eq!(fired.origin, DVec2::new(10.0, 20.0));
        assert!((fired.distance - 150.0 * 0.01).abs() < 1e-9);

        // Second press while locked sends nothing new.
        h.tick(fire);
        h.tick(InputSample::default());
        let resent: Vec<_> = h
            .sent()
            .into_iter()
            .filter(|m| matches!(m, ClientMessage::Shot(_)))
            .collect();
        // Only transport retries of the first shot.
        assert!(resent.iter().all(|m| m == &shots[0]));
        assert_eq!(h.engine.session().pending_reliable(), 1);
    }

    #[test]
    fn test_focus_loss_cancels_charge() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);

        h.tick(InputSample {
            fire: true,
            ..Default::default()
        });
        assert!(h.engine.shots().charge().is_charging());

        h.tick(InputSample {
            fire: true,
            focused: false,
            ..Default::default()
        });
        assert_eq!(h.engine.shots().charge().distance(), 0.0);

        // Refocusing with the button already up must not release a shot.
        h.tick(InputSample::default());

        assert!(!h
            .sent()
            .iter()
            .any(|m| matches!(m, ClientMessage::Shot(_))));
        assert!(h.engine.local_player().unwrap().shot_allowed);
        assert_eq!(h.engine.session().pending_reliable(), 0);
    }

    #[test]
    fn test_shot_echo_confirms_reliable_send() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);
        h.tick(InputSample {
            fire: true,
            ..Default::default()
        });
        h.tick(InputSample::default());
        assert_eq!(h.engine.session().pending_reliable(), 1);

        let echo = h
            .sent()
            .into_iter()
            .find_map(|m| match m {
                ClientMessage::Shot(fired) => Some(fired),
                _ => None,
            })
            .unwrap();
        h.push(ServerMessage::Shot(echo));
        h.tick(InputSample::default());

        assert_eq!(h.engine.session().pending_reliable(), 0);
        assert!(h.engine.local_player().unwrap().shot.is_some());
    }

    #[test]
    fn test_tile_damage_without_shot_echo_unlocks() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);
        h.tick(InputSample {
            fire: true,
            ..Default::default()
        });
        h.tick(InputSample::default());
        assert!(!h.engine.local_player().unwrap().shot_allowed);

        h.push(ServerMessage::TileDamaged { x: 0.0, y: 0.0, id: 2 });
        h.tick(InputSample::default());

        assert!(h.engine.local_player().unwrap().shot_allowed);
        assert_eq!(h.engine.session().pending_reliable(), 0);
        assert_eq!(h.map.get(0, 0).unwrap().damage(), 1);
    }

    #[test]
    fn test_remote_shot_does_not_touch_local_lock() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);
        h.connect(5, "Eve", 1234);

        h.apply(ServerMessage::Shot(ShotFired {
            id: 5,
            origin: DVec2::ZERO,
            direction: 0.0,
            distance: 30.0,
        }));

        assert!(h.engine.local_player().unwrap().shot_allowed);
        assert!(h.engine.registry().get(5).unwrap().shot.is_some());
    }

    #[test]
    fn test_shutdown_acknowledged_by_echo() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);
        h.push(ServerMessage::Disconnect { id: 2 });

        let Harness {
            engine, mut server, ..
        } = h;
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(engine.shutdown(&clock), DisconnectOutcome::Acknowledged);
        assert_eq!(clock.now(), start);
        assert_eq!(
            decode_sent(&mut server),
            vec![ClientMessage::Disconnect { id: 2 }]
        );
    }

    #[test]
    fn test_shutdown_times_out_after_one_second() {
        let mut h = Harness::new("Bob");
        h.connect(2, "Bob", LOCAL_PORT);
        // Someone else's disconnect is not our echo.
        h.push(ServerMessage::Disconnect { id: 3 });

        let Harness {
            engine, mut server, ..
        } = h;
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(engine.shutdown(&clock), DisconnectOutcome::TimedOut);

        assert_eq!(clock.now() - start, Duration::from_secs(1));
        let sent = decode_sent(&mut server);
        assert!(sent.len() > 1);
        assert!(sent
            .iter()
            .all(|m| m == &ClientMessage::Disconnect { id: 2 }));
    }

    /// Reports nothing waiting until the `echo_on`-th receive, which yields
    /// the DISCONNECT echo for `id`.
    struct LateEchoChannel {
        id: PlayerId,
        echo_on: u32,
        recv_calls: u32,
    }

    impl DatagramChannel for LateEchoChannel {
        fn send(&mut self, data: &[u8]) -> std::io::Result<usize> {
            Ok(data.len())
        }

        fn recv(&mut self, buf: &mut [u8]) -> std::io::Result<Option<usize>> {
            self.recv_calls += 1;
            if self.recv_calls != self.echo_on {
                return Ok(None);
            }
            let echo = ServerMessage::Disconnect { id: self.id }.encode().unwrap();
            buf[..echo.len()].copy_from_slice(&echo);
            Ok(Some(echo.len()))
        }

        fn local_port(&self) -> u16 {
            LOCAL_PORT
        }
    }

    #[test]
    fn test_shutdown_acknowledged_by_late_echo() {
        let channel = LateEchoChannel {
            id: 2,
            echo_on: 40,
            recv_calls: 0,
        };
        let mut engine =
            SyncEngine::new(Session::new(channel), "Bob", &ClientConfig::default()).unwrap();
        let mut map = HexMap::new(8, 8);
        engine.apply(
            ServerMessage::Connect {
                id: 2,
                name: "Bob".to_string(),
                port: LOCAL_PORT,
            },
            &mut map,
        );
        assert_eq!(engine.current_player(), Some(2));

        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(engine.shutdown(&clock), DisconnectOutcome::Acknowledged);

        // One empty poll per 5 ms wait before the echo shows up.
        let waited = clock.now() - start;
        assert_eq!(waited, DRAIN_POLL_INTERVAL * 39);
        assert!(waited < Duration::from_secs(1));
    }

    #[test]
    fn test_shutdown_before_bind() {
        let mut h = Harness::new("Bob");
        h.tick(InputSample::default());

        let clock = ManualClock::new();
        assert_eq!(h.engine.shutdown(&clock), DisconnectOutcome::NotConnected);
    }

    #[test]
    fn test_overlong_name_rejected() {
        let (client, _server) = LoopbackChannel::pair(1, 2);
        let name = "n".repeat(MAX_NAME_LEN + 1);
        assert!(SyncEngine::new(Session::new(client), name, &ClientConfig::default()).is_err());
    }
}
