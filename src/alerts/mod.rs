//! Tiered, debounced alerting
//!
//! The [`AlertEngine`] turns a stream of [`FlagEvent`]s into a small number of
//! user-facing alerts. Soft flags are counted per `(flag type, question)` key:
//!
//! - hard severity → hard alert immediately, key cleared
//! - count reaches `hard_alert_frames` → hard alert, key cleared
//! - count reaches `soft_alert_frames` → soft alert, key kept for escalation
//!
//! Soft alerts auto-dismiss through the injected [`Scheduler`]; hard alerts stay
//! until acknowledged or dismissed.

pub mod audio;
pub mod messages;
pub mod scheduler;

pub use audio::{default_tone_sink, AudioConfig, LogToneSink, Tone, ToneSink, ToneSinkFactory};
pub use messages::alert_message;
pub use scheduler::{Scheduler, TimerId, TimerQueue};

use crate::clock::Clock;
use crate::error::VigilError;
use crate::types::{FlagEvent, FlagType, Severity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Debounce scope used when a flag carries no question id
pub const GLOBAL_SCOPE: &str = "global";

/// Alert tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Soft,
    Hard,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Soft => "soft",
            AlertKind::Hard => "hard",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-facing alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    /// Flag that triggered the alert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<FlagEvent>,
}

/// Alert state callbacks; every method defaults to a no-op
pub trait AlertListener {
    fn on_soft_alert(&mut self, _alert: &Alert) {}
    fn on_hard_alert(&mut self, _alert: &Alert) {}
    fn on_alert_dismissed(&mut self, _alert: &Alert) {}
}

/// Debounce and presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Soft occurrences per key before a soft alert
    pub soft_alert_frames: u32,
    /// Soft occurrences per key before escalating to a hard alert
    pub hard_alert_frames: u32,
    /// Idle pending keys are purged after twice this
    pub grace_period_ms: u64,
    /// Soft alerts dismiss themselves after this long
    pub soft_alert_duration_ms: u64,
    pub audio: AudioConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            soft_alert_frames: 3,
            hard_alert_frames: 5,
            grace_period_ms: 2000,
            soft_alert_duration_ms: 3000,
            audio: AudioConfig::default(),
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), VigilError> {
        // Hard escalation is checked first, so a soft threshold at or above the hard
        // one could never fire.
        if self.soft_alert_frames == 0 || self.soft_alert_frames >= self.hard_alert_frames {
            return Err(VigilError::InvalidConfig(format!(
                "alert frames must satisfy 0 < soft ({}) < hard ({})",
                self.soft_alert_frames, self.hard_alert_frames
            )));
        }
        if self.soft_alert_duration_ms == 0 {
            return Err(VigilError::InvalidConfig(
                "soft_alert_duration_ms must be positive".to_string(),
            ));
        }
        self.audio.validate()
    }

    fn stale_after(&self) -> Duration {
        millis(self.grace_period_ms.saturating_mul(2))
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

#[derive(Debug, Clone, Copy)]
struct PendingFlag {
    count: u32,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

type DebounceKey = (FlagType, String);

/// Debounced alert state machine
pub struct AlertEngine {
    config: AlertConfig,
    clock: Arc<dyn Clock>,
    scheduler: Box<dyn Scheduler>,
    listeners: Vec<Box<dyn AlertListener>>,
    pending: HashMap<DebounceKey, PendingFlag>,
    active: BTreeMap<u64, Alert>,
    dismiss_timers: HashMap<TimerId, u64>,
    next_id: u64,
    tone_factory: ToneSinkFactory,
    tone_sink: Option<Box<dyn ToneSink>>,
    disposed: bool,
}

impl fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertEngine")
            .field("config", &self.config)
            .field("active", &self.active.len())
            .field("pending", &self.pending.len())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl AlertEngine {
    /// Engine with an in-memory [`TimerQueue`] and the default tone sink
    pub fn new(config: AlertConfig, clock: Arc<dyn Clock>) -> Result<Self, VigilError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            scheduler: Box::new(TimerQueue::new()),
            listeners: Vec::new(),
            pending: HashMap::new(),
            active: BTreeMap::new(),
            dismiss_timers: HashMap::new(),
            next_id: 1,
            tone_factory: Box::new(default_tone_sink),
            tone_sink: None,
            disposed: false,
        })
    }

    pub fn with_scheduler(mut self, scheduler: Box<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_tone_sink_factory(mut self, factory: ToneSinkFactory) -> Self {
        self.set_tone_sink_factory(factory);
        self
    }

    /// Replace the audio backend; the current sink, if any, is closed
    pub fn set_tone_sink_factory(&mut self, factory: ToneSinkFactory) {
        self.close_audio();
        self.tone_factory = factory;
    }

    pub fn add_listener(&mut self, listener: Box<dyn AlertListener>) {
        if !self.disposed {
            self.listeners.push(listener);
        }
    }

    /// Count a flag occurrence; returns the alert it raised, if any
    pub fn process_flag(&mut self, flag: &FlagEvent) -> Option<Alert> {
        if self.disposed {
            log::debug!("ignoring {} flag on disposed alert engine", flag.flag_type);
            return None;
        }
        let now = self.clock.now();
        self.sweep_pending(now);

        let key: DebounceKey = (
            flag.flag_type,
            flag.question_id
                .clone()
                .unwrap_or_else(|| GLOBAL_SCOPE.to_string()),
        );
        let entry = self.pending.entry(key.clone()).or_insert(PendingFlag {
            count: 0,
            first_seen: now,
            last_seen: now,
        });
        entry.count += 1;
        entry.last_seen = now;
        let count = entry.count;

        if flag.severity == Severity::Hard || count >= self.config.hard_alert_frames {
            self.pending.remove(&key);
            return Some(self.emit(AlertKind::Hard, flag, now));
        }
        if count == self.config.soft_alert_frames {
            return Some(self.emit(AlertKind::Soft, flag, now));
        }
        None
    }

    /// Drop pending keys with no occurrence for twice the grace period
    fn sweep_pending(&mut self, now: DateTime<Utc>) {
        let stale_after = self.config.stale_after();
        let before = self.pending.len();
        self.pending
            .retain(|_, pending| now - pending.last_seen <= stale_after);
        let purged = before - self.pending.len();
        if purged > 0 {
            log::debug!("purged {purged} idle pending flag key(s)");
        }
    }

    fn emit(&mut self, kind: AlertKind, flag: &FlagEvent, now: DateTime<Utc>) -> Alert {
        let id = self.next_id;
        self.next_id += 1;
        let alert = Alert {
            id,
            kind,
            message: alert_message(flag.flag_type, kind).to_string(),
            timestamp: now,
            acknowledged: false,
            flag: Some(flag.clone()),
        };
        self.active.insert(id, alert.clone());

        if kind == AlertKind::Soft {
            let timer = self
                .scheduler
                .schedule_once(now, millis(self.config.soft_alert_duration_ms));
            self.dismiss_timers.insert(timer, id);
        }

        log::info!("{kind} alert #{id} for {}: {}", flag.flag_type, alert.message);
        self.play_cue(kind);
        for listener in &mut self.listeners {
            match kind {
                AlertKind::Soft => listener.on_soft_alert(&alert),
                AlertKind::Hard => listener.on_hard_alert(&alert),
            }
        }
        alert
    }

    fn play_cue(&mut self, kind: AlertKind) {
        if !self.config.audio.enabled {
            return;
        }
        if self.tone_sink.is_none() {
            match (self.tone_factory)() {
                Ok(sink) => self.tone_sink = Some(sink),
                Err(e) => {
                    log::warn!("alert audio unavailable: {e}");
                    return;
                }
            }
        }
        let tone = self.config.audio.tone_for(kind);
        if let Some(sink) = self.tone_sink.as_mut() {
            if let Err(e) = sink.play(&tone) {
                log::warn!("failed to play {kind} alert tone: {e}");
            }
        }
    }

    fn close_audio(&mut self) {
        if let Some(mut sink) = self.tone_sink.take() {
            sink.close();
        }
    }

    /// Dismiss soft alerts whose display time has elapsed; returns them
    pub fn poll_timers(&mut self) -> Vec<Alert> {
        if self.disposed {
            return Vec::new();
        }
        let now = self.clock.now();
        let mut dismissed = Vec::new();
        for timer in self.scheduler.take_due(now) {
            if let Some(alert_id) = self.dismiss_timers.remove(&timer) {
                if let Some(alert) = self.dismiss_alert(alert_id) {
                    dismissed.push(alert);
                }
            }
        }
        dismissed
    }

    /// Mark an alert acknowledged and dismiss it
    pub fn acknowledge_alert(&mut self, id: u64) -> Option<Alert> {
        let alert = self.active.get_mut(&id)?;
        alert.acknowledged = true;
        log::debug!("alert #{id} acknowledged");
        self.dismiss_alert(id)
    }

    /// Remove an active alert and notify listeners
    pub fn dismiss_alert(&mut self, id: u64) -> Option<Alert> {
        let alert = self.active.remove(&id)?;
        if let Some(timer) = self
            .dismiss_timers
            .iter()
            .find_map(|(timer, alert_id)| (*alert_id == id).then_some(*timer))
        {
            self.dismiss_timers.remove(&timer);
            self.scheduler.cancel(timer);
        }

        log::debug!("alert #{id} dismissed");
        for listener in &mut self.listeners {
            listener.on_alert_dismissed(&alert);
        }
        Some(alert)
    }

    /// Active alerts, oldest first
    pub fn active_alerts(&self) -> Vec<&Alert> {
        self.active.values().collect()
    }

    pub fn active_alerts_by_kind(&self, kind: AlertKind) -> Vec<&Alert> {
        self.active.values().filter(|a| a.kind == kind).collect()
    }

    /// Dismiss every active alert
    pub fn clear_all_alerts(&mut self) {
        let ids: Vec<u64> = self.active.keys().copied().collect();
        for id in ids {
            self.dismiss_alert(id);
        }
    }

    /// Occurrences currently counted for a `(type, question)` key
    pub fn pending_count(&self, flag_type: FlagType, question_id: Option<&str>) -> u32 {
        let key = (
            flag_type,
            question_id.unwrap_or(GLOBAL_SCOPE).to_string(),
        );
        self.pending.get(&key).map_or(0, |p| p.count)
    }

    /// When a key's current run of occurrences began
    pub fn pending_since(
        &self,
        flag_type: FlagType,
        question_id: Option<&str>,
    ) -> Option<DateTime<Utc>> {
        let key = (
            flag_type,
            question_id.unwrap_or(GLOBAL_SCOPE).to_string(),
        );
        self.pending.get(&key).map(|p| p.first_seen)
    }

    /// Swap the configuration; the tone sink is rebuilt if audio settings changed
    pub fn update_config(&mut self, config: AlertConfig) -> Result<(), VigilError> {
        config.validate()?;
        if self.disposed {
            return Ok(());
        }
        if config.audio != self.config.audio {
            self.close_audio();
        }
        self.config = config;
        log::info!("alert configuration updated");
        Ok(())
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Tear down: alerts, pending keys, timers and audio are released and every
    /// later call becomes a no-op
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.active.clear();
        self.pending.clear();
        self.dismiss_timers.clear();
        self.scheduler.cancel_all();
        self.listeners.clear();
        self.close_audio();
        self.disposed = true;
        log::debug!("alert engine disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for AlertEngine {
    fn drop(&mut self) {
        self.close_audio();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::AudioError;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Events {
        soft: Vec<u64>,
        hard: Vec<u64>,
        dismissed: Vec<(u64, bool)>,
    }

    struct Recorder(Rc<RefCell<Events>>);

    impl AlertListener for Recorder {
        fn on_soft_alert(&mut self, alert: &Alert) {
            self.0.borrow_mut().soft.push(alert.id);
        }
        fn on_hard_alert(&mut self, alert: &Alert) {
            self.0.borrow_mut().hard.push(alert.id);
        }
        fn on_alert_dismissed(&mut self, alert: &Alert) {
            self.0
                .borrow_mut()
                .dismissed
                .push((alert.id, alert.acknowledged));
        }
    }

    struct RecordingSink(Rc<RefCell<Vec<Tone>>>);

    impl ToneSink for RecordingSink {
        fn play(&mut self, tone: &Tone) -> Result<(), AudioError> {
            self.0.borrow_mut().push(*tone);
            Ok(())
        }
    }

    fn factory<F>(build: F) -> ToneSinkFactory
    where
        F: Fn() -> Result<Box<dyn ToneSink>, AudioError> + 'static,
    {
        Box::new(build)
    }

    fn engine() -> (AlertEngine, ManualClock, Rc<RefCell<Events>>) {
        let clock = ManualClock::at_epoch();
        let mut engine = AlertEngine::new(AlertConfig::default(), Arc::new(clock.clone()))
            .unwrap()
            .with_tone_sink_factory(factory(|| Ok(Box::new(LogToneSink))));
        let events = Rc::new(RefCell::new(Events::default()));
        engine.add_listener(Box::new(Recorder(Rc::clone(&events))));
        (engine, clock, events)
    }

    fn soft_eyes_off() -> FlagEvent {
        FlagEvent::soft(FlagType::EyesOff)
    }

    #[test]
    fn test_hard_flag_alerts_immediately() {
        let (mut engine, _, events) = engine();
        engine.process_flag(&soft_eyes_off());
        engine.process_flag(&soft_eyes_off());

        let alert = engine
            .process_flag(&FlagEvent::hard(FlagType::EyesOff))
            .unwrap();
        assert_eq!(alert.kind, AlertKind::Hard);
        assert_eq!(events.borrow().hard, vec![alert.id]);
        assert_eq!(engine.pending_count(FlagType::EyesOff, None), 0);
    }

    #[test]
    fn test_soft_alert_at_soft_threshold() {
        let (mut engine, _, events) = engine();
        assert!(engine.process_flag(&soft_eyes_off()).is_none());
        assert!(engine.process_flag(&soft_eyes_off()).is_none());

        let alert = engine.process_flag(&soft_eyes_off()).unwrap();
        assert_eq!(alert.kind, AlertKind::Soft);
        assert_eq!(alert.message, alert_message(FlagType::EyesOff, AlertKind::Soft));
        assert_eq!(events.borrow().soft.len(), 1);
        // Count is kept for escalation
        assert_eq!(engine.pending_count(FlagType::EyesOff, None), 3);
    }

    #[test]
    fn test_escalates_to_hard_and_resets_counter() {
        let (mut engine, _, events) = engine();
        let alerts: Vec<Alert> = (0..5)
            .filter_map(|_| engine.process_flag(&soft_eyes_off()))
            .collect();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::Soft);
        assert_eq!(alerts[1].kind, AlertKind::Hard);
        assert_eq!(engine.pending_count(FlagType::EyesOff, None), 0);
        assert_eq!(events.borrow().hard.len(), 1);

        // The cycle starts over
        assert!(engine.process_flag(&soft_eyes_off()).is_none());
        assert_eq!(engine.pending_count(FlagType::EyesOff, None), 1);
    }

    #[test]
    fn test_questions_debounce_independently() {
        let (mut engine, _, _) = engine();
        let q1 = FlagEvent::soft(FlagType::TabBlur).with_question("q-1");
        let q2 = FlagEvent::soft(FlagType::TabBlur).with_question("q-2");

        engine.process_flag(&q1);
        engine.process_flag(&q1);
        engine.process_flag(&q2);
        engine.process_flag(&q2);
        assert!(engine.process_flag(&q1).is_some());
        assert_eq!(engine.pending_count(FlagType::TabBlur, Some("q-1")), 3);
        assert_eq!(engine.pending_count(FlagType::TabBlur, Some("q-2")), 2);
        assert_eq!(engine.pending_count(FlagType::TabBlur, None), 0);
    }

    #[test]
    fn test_idle_keys_are_swept() {
        let (mut engine, clock, _) = engine();
        engine.process_flag(&soft_eyes_off());
        engine.process_flag(&soft_eyes_off());
        let since = engine.pending_since(FlagType::EyesOff, None);
        assert_eq!(since, Some(clock.now()));

        clock.advance_ms(4001);
        // The sweep runs before counting, so this starts a fresh run
        assert!(engine.process_flag(&soft_eyes_off()).is_none());
        assert_eq!(engine.pending_count(FlagType::EyesOff, None), 1);
        assert_eq!(engine.pending_since(FlagType::EyesOff, None), Some(clock.now()));
    }

    #[test]
    fn test_recent_keys_survive_sweep() {
        let (mut engine, clock, _) = engine();
        engine.process_flag(&soft_eyes_off());
        clock.advance_ms(3000);
        engine.process_flag(&soft_eyes_off());
        clock.advance_ms(3000);
        assert!(engine.process_flag(&soft_eyes_off()).is_some());
    }

    #[test]
    fn test_soft_alert_auto_dismisses() {
        let (mut engine, clock, events) = engine();
        let hard = engine
            .process_flag(&FlagEvent::hard(FlagType::SecondFace))
            .unwrap();
        for _ in 0..3 {
            engine.process_flag(&soft_eyes_off());
        }
        assert_eq!(engine.active_alerts().len(), 2);

        clock.advance_ms(2999);
        assert!(engine.poll_timers().is_empty());

        clock.advance_ms(1);
        let dismissed = engine.poll_timers();
        assert_eq!(dismissed.len(), 1);
        assert_eq!(dismissed[0].kind, AlertKind::Soft);

        // Hard alerts persist
        let remaining = engine.active_alerts();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, hard.id);
        assert_eq!(events.borrow().dismissed, vec![(dismissed[0].id, false)]);
    }

    #[test]
    fn test_unbounded_soft_duration_never_auto_dismisses() {
        let (mut engine, clock, _) = engine();
        engine
            .update_config(AlertConfig {
                soft_alert_duration_ms: u64::MAX,
                ..AlertConfig::default()
            })
            .unwrap();
        let mut alert = None;
        for _ in 0..3 {
            alert = engine.process_flag(&soft_eyes_off());
        }
        assert_eq!(alert.map(|a| a.kind), Some(AlertKind::Soft));

        clock.advance_ms(365 * 86_400_000);
        assert!(engine.poll_timers().is_empty());
        assert_eq!(engine.active_alerts().len(), 1);
    }

    #[test]
    fn test_acknowledge_and_dismiss() {
        let (mut engine, _, events) = engine();
        let first = engine
            .process_flag(&FlagEvent::hard(FlagType::DeviceObject))
            .unwrap();
        let second = engine
            .process_flag(&FlagEvent::hard(FlagType::FullscreenExit))
            .unwrap();
        assert!(second.id > first.id);

        let acknowledged = engine.acknowledge_alert(first.id).unwrap();
        assert!(acknowledged.acknowledged);
        assert!(engine.acknowledge_alert(first.id).is_none());

        assert!(engine.dismiss_alert(second.id).is_some());
        assert!(engine.active_alerts().is_empty());
        assert_eq!(
            events.borrow().dismissed,
            vec![(first.id, true), (second.id, false)]
        );
    }

    #[test]
    fn test_manual_dismiss_cancels_timer() {
        let (mut engine, clock, events) = engine();
        for _ in 0..3 {
            engine.process_flag(&soft_eyes_off());
        }
        let id = engine.active_alerts()[0].id;
        engine.dismiss_alert(id);

        clock.advance_ms(5000);
        assert!(engine.poll_timers().is_empty());
        assert_eq!(events.borrow().dismissed.len(), 1);
    }

    #[test]
    fn test_active_alerts_by_kind_and_clear() {
        let (mut engine, _, events) = engine();
        engine.process_flag(&FlagEvent::hard(FlagType::TabBlur));
        for _ in 0..3 {
            engine.process_flag(&FlagEvent::soft(FlagType::DownGlance));
        }
        assert_eq!(engine.active_alerts_by_kind(AlertKind::Hard).len(), 1);
        assert_eq!(engine.active_alerts_by_kind(AlertKind::Soft).len(), 1);

        engine.clear_all_alerts();
        assert!(engine.active_alerts().is_empty());
        assert_eq!(events.borrow().dismissed.len(), 2);
    }

    #[test]
    fn test_alert_ids_are_monotonic() {
        let (mut engine, _, _) = engine();
        let ids: Vec<u64> = FlagType::ALL
            .iter()
            .filter_map(|&t| engine.process_flag(&FlagEvent::hard(t)))
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, (1..=10).collect::<Vec<u64>>());
    }

    #[test]
    fn test_audio_plays_distinct_tones() {
        let (engine, _, _) = engine();
        let tones = Rc::new(RefCell::new(Vec::new()));
        let sink_tones = Rc::clone(&tones);
        let mut engine = engine.with_tone_sink_factory(factory(move || {
            Ok(Box::new(RecordingSink(Rc::clone(&sink_tones))))
        }));

        engine.process_flag(&FlagEvent::hard(FlagType::SecondFace));
        for _ in 0..3 {
            engine.process_flag(&soft_eyes_off());
        }
        let tones = tones.borrow();
        assert_eq!(tones.len(), 2);
        assert_eq!(tones[0].frequency_hz, 880.0);
        assert_eq!(tones[1].frequency_hz, 440.0);
    }

    #[test]
    fn test_audio_failure_does_not_block_alert() {
        let (engine, _, events) = engine();
        let mut engine = engine.with_tone_sink_factory(factory(|| {
            Err(AudioError::Unavailable("no output device".to_string()))
        }));
        let alert = engine.process_flag(&FlagEvent::hard(FlagType::IntegrityViolation));
        assert!(alert.is_some());
        assert_eq!(events.borrow().hard.len(), 1);
    }

    #[test]
    fn test_audio_disabled_skips_sink() {
        let (engine, _, _) = engine();
        let built = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&built);
        let mut engine = engine.with_tone_sink_factory(factory(move || {
            *counter.borrow_mut() += 1;
            Ok(Box::new(LogToneSink))
        }));
        let mut config = AlertConfig::default();
        config.audio.enabled = false;
        engine.update_config(config).unwrap();

        engine.process_flag(&FlagEvent::hard(FlagType::TabBlur));
        assert_eq!(*built.borrow(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (mut engine, _, _) = engine();
        let result = engine.update_config(AlertConfig {
            soft_alert_frames: 5,
            hard_alert_frames: 5,
            ..Default::default()
        });
        assert!(result.is_err());
        assert_eq!(engine.config(), &AlertConfig::default());
    }

    #[test]
    fn test_dispose_renders_engine_inert() {
        let (mut engine, clock, events) = engine();
        for _ in 0..3 {
            engine.process_flag(&soft_eyes_off());
        }
        engine.dispose();
        assert!(engine.is_disposed());
        assert!(engine.active_alerts().is_empty());
        assert_eq!(engine.pending_count(FlagType::EyesOff, None), 0);

        clock.advance_ms(10_000);
        assert!(engine.poll_timers().is_empty());
        assert!(engine
            .process_flag(&FlagEvent::hard(FlagType::SecondFace))
            .is_none());
        assert_eq!(events.borrow().dismissed.len(), 0);
        assert_eq!(events.borrow().hard.len(), 0);
    }
}
