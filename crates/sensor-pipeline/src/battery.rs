//! Battery voltage sampling and charge estimation

use crate::bus::ReadingPublisher;
use crate::driver::BatteryFrontEnd;
use crate::error::{CurveError, DriverError, PublishError};
use crate::event::BatteryReading;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::time::Instant;

/// Default sampling period
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// Full charge in parts per ten thousand
pub const FULL_PPTT: i32 = 10_000;

/// One point of a discharge curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Remaining charge in parts per ten thousand
    pub pptt: i32,
    /// Battery voltage at that charge
    pub millivolts: i32,
}

impl CurvePoint {
    #[must_use]
    pub const fn new(pptt: i32, millivolts: i32) -> Self {
        Self { pptt, millivolts }
    }
}

/// Remaining charge (pptt) at `millivolts` on a curve sorted by descending
/// voltage.
///
/// Voltages at or above the first point clamp to its level; voltages below
/// the last point clamp to the last level. In between the level is linearly
/// interpolated with truncating integer division, biased toward the lower
/// point.
#[must_use]
pub fn battery_level_pptt(millivolts: i32, curve: &[CurvePoint]) -> i32 {
    let Some(first) = curve.first() else {
        return 0;
    };
    if millivolts >= first.millivolts {
        return first.pptt;
    }

    let last = curve.len() - 1;
    let mut i = 0;
    while i < last && curve[i].pptt > 0 && millivolts < curve[i].millivolts {
        i += 1;
    }

    let below = curve[i];
    if millivolts < below.millivolts {
        return below.pptt;
    }

    // i > 0 here: the first point was handled above
    let above = curve[i - 1];
    let span = i64::from(above.pptt) - i64::from(below.pptt);
    let offset = i64::from(millivolts) - i64::from(below.millivolts);
    let width = i64::from(above.millivolts) - i64::from(below.millivolts);
    // lies between below.pptt and above.pptt, so it fits back into i32
    let level = i64::from(below.pptt) + span * offset / width;
    i32::try_from(level).unwrap_or(above.pptt)
}

/// Validated voltage to charge mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CurvePoint>", into = "Vec<CurvePoint>")]
pub struct DischargeCurve {
    points: Vec<CurvePoint>,
}

impl Default for DischargeCurve {
    /// Straight line from 3.2 V (full) down to 2.7 V (empty)
    fn default() -> Self {
        Self {
            points: vec![CurvePoint::new(FULL_PPTT, 3200), CurvePoint::new(0, 2700)],
        }
    }
}

impl DischargeCurve {
    /// Validate a curve: non-empty, strictly descending voltage, levels
    /// within 0..=10000 that never increase as voltage drops
    pub fn new(points: Vec<CurvePoint>) -> Result<Self, CurveError> {
        if points.is_empty() {
            return Err(CurveError::Empty);
        }
        for (index, point) in points.iter().enumerate() {
            if !(0..=FULL_PPTT).contains(&point.pptt) {
                return Err(CurveError::LevelOutOfRange {
                    index,
                    pptt: point.pptt,
                });
            }
            if index > 0 {
                let prev = points[index - 1];
                if point.millivolts >= prev.millivolts {
                    return Err(CurveError::NotDescending { index });
                }
                if point.pptt > prev.pptt {
                    return Err(CurveError::LevelIncreasing { index });
                }
            }
        }
        Ok(Self { points })
    }

    /// Two-point curve between a full and an empty voltage
    pub fn linear(full_mv: i32, empty_mv: i32) -> Result<Self, CurveError> {
        Self::new(vec![
            CurvePoint::new(FULL_PPTT, full_mv),
            CurvePoint::new(0, empty_mv),
        ])
    }

    #[must_use]
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Remaining charge in parts per ten thousand
    #[must_use]
    pub fn level_pptt(&self, millivolts: i32) -> i32 {
        battery_level_pptt(millivolts, &self.points)
    }

    /// Remaining charge in whole percent (truncated)
    #[must_use]
    pub fn percent(&self, millivolts: i32) -> i32 {
        self.level_pptt(millivolts) / 100
    }
}

impl TryFrom<Vec<CurvePoint>> for DischargeCurve {
    type Error = CurveError;

    fn try_from(points: Vec<CurvePoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<DischargeCurve> for Vec<CurvePoint> {
    fn from(curve: DischargeCurve) -> Self {
        curve.points
    }
}

/// Where the sampler is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Sampling,
    Published,
    Failed,
}

/// Holds the sense-enable output high while alive and drives it low on drop
struct SenseEnable<'a, F: BatteryFrontEnd> {
    front_end: &'a mut F,
}

impl<'a, F: BatteryFrontEnd> SenseEnable<'a, F> {
    fn enable(front_end: &'a mut F) -> Result<Self, DriverError> {
        let mut guard = Self { front_end };
        guard.front_end.set_enable(true)?;
        Ok(guard)
    }
}

impl<F: BatteryFrontEnd> Deref for SenseEnable<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.front_end
    }
}

impl<F: BatteryFrontEnd> DerefMut for SenseEnable<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        self.front_end
    }
}

impl<F: BatteryFrontEnd> Drop for SenseEnable<'_, F> {
    fn drop(&mut self) {
        if let Err(e) = self.front_end.set_enable(false) {
            tracing::error!("Failed to disable battery sense: {}", e);
        }
    }
}

/// Samples the battery front end and converts voltage to charge
pub struct BatterySampler<F> {
    front_end: F,
    curve: DischargeCurve,
    state: SamplerState,
}

impl<F: BatteryFrontEnd> BatterySampler<F> {
    #[must_use]
    pub fn new(front_end: F, curve: DischargeCurve) -> Self {
        Self {
            front_end,
            curve,
            state: SamplerState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> SamplerState {
        self.state
    }

    #[must_use]
    pub fn front_end(&self) -> &F {
        &self.front_end
    }

    /// Run one sampling cycle. Returns the reading to publish, or `None` if
    /// the measurement failed.
    pub fn sample(&mut self) -> Option<BatteryReading> {
        self.state = SamplerState::Sampling;

        match self.measure() {
            Ok(millivolts) => {
                let percent = self.curve.percent(millivolts);
                tracing::debug!("Battery: {} mV ({}%)", millivolts, percent);
                self.state = SamplerState::Published;
                Some(BatteryReading {
                    millivolts,
                    percent,
                })
            }
            Err(e) => {
                tracing::error!("Battery measurement failed: {}", e);
                self.state = SamplerState::Failed;
                None
            }
        }
    }

    fn measure(&mut self) -> Result<i32, DriverError> {
        let mut sense = SenseEnable::enable(&mut self.front_end)?;
        let raw = sense.read()?;
        let millivolts = sense.raw_to_millivolts(raw);
        if millivolts < 0 {
            return Err(DriverError::InvalidMeasurement(millivolts));
        }
        Ok(millivolts)
    }

    /// Sample every `period`, publishing each successful reading with a
    /// bounded wait. The next cycle is armed after every cycle, whatever its
    /// outcome. Returns once the consumer is gone.
    pub async fn run(
        mut self,
        publisher: ReadingPublisher<BatteryReading>,
        period: Duration,
        publish_timeout: Duration,
    ) {
        let mut deadline = Instant::now() + period;
        loop {
            tokio::time::sleep_until(deadline).await;
            tracing::trace!("Battery sample event");

            if let Some(reading) = self.sample() {
                match publisher.publish(reading, publish_timeout).await {
                    Ok(()) => {}
                    Err(e @ PublishError::Timeout { .. }) => {
                        tracing::warn!("Dropped battery reading: {}", e);
                    }
                    Err(PublishError::Closed(_)) => {
                        tracing::info!("{} channel closed, stopping sampler", publisher.name());
                        break;
                    }
                }
            }

            self.state = SamplerState::Idle;
            deadline = Instant::now() + period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::reading_channel;
    use std::collections::VecDeque;

    fn two_point() -> DischargeCurve {
        DischargeCurve::default()
    }

    /// Front end replaying scripted conversions; raw codes are millivolts
    struct ScriptedFrontEnd {
        codes: VecDeque<Result<i32, DriverError>>,
        enable_log: Vec<bool>,
        fail_enable: bool,
    }

    impl ScriptedFrontEnd {
        fn new(codes: impl IntoIterator<Item = Result<i32, DriverError>>) -> Self {
            Self {
                codes: codes.into_iter().collect(),
                enable_log: Vec::new(),
                fail_enable: false,
            }
        }

        fn millivolts(values: &[i32]) -> Self {
            Self::new(values.iter().copied().map(Ok))
        }
    }

    impl BatteryFrontEnd for ScriptedFrontEnd {
        fn set_enable(&mut self, enabled: bool) -> Result<(), DriverError> {
            self.enable_log.push(enabled);
            if enabled && self.fail_enable {
                return Err(DriverError::Gpio("stuck".to_string()));
            }
            Ok(())
        }

        fn read(&mut self) -> Result<i32, DriverError> {
            self.codes.pop_front().unwrap_or(Err(DriverError::ReadFailed(-5)))
        }

        fn raw_to_millivolts(&self, raw: i32) -> i32 {
            raw
        }
    }

    #[test]
    fn test_clamp_high() {
        assert_eq!(two_point().level_pptt(3300), 10_000);
        assert_eq!(two_point().level_pptt(3200), 10_000);
    }

    #[test]
    fn test_clamp_low() {
        assert_eq!(two_point().level_pptt(2600), 0);
        assert_eq!(two_point().level_pptt(2700), 0);
    }

    #[test]
    fn test_midpoint() {
        // 0 + (10000 - 0) * (2950 - 2700) / (3200 - 2700)
        assert_eq!(two_point().level_pptt(2950), 5000);
    }

    #[test]
    fn test_truncates_toward_lower_point() {
        // 10000 * 1 / 500 = 20, 10000 * 3 / 500 = 60
        assert_eq!(two_point().level_pptt(2701), 20);
        let curve = DischargeCurve::linear(3000, 2997).unwrap();
        // 10000 * 1 / 3 = 3333.33
        assert_eq!(curve.level_pptt(2998), 3333);
    }

    #[test]
    fn test_multi_point_segments() {
        let curve = DischargeCurve::new(vec![
            CurvePoint::new(10_000, 4200),
            CurvePoint::new(5_000, 3700),
            CurvePoint::new(1_000, 3400),
            CurvePoint::new(0, 3000),
        ])
        .unwrap();

        assert_eq!(curve.level_pptt(3700), 5_000);
        assert_eq!(curve.level_pptt(3950), 7_500);
        assert_eq!(curve.level_pptt(3550), 3_000);
        assert_eq!(curve.level_pptt(3200), 500);
        assert_eq!(curve.level_pptt(2900), 0);
    }

    #[test]
    fn test_last_level_above_zero_clamps() {
        let curve = DischargeCurve::new(vec![
            CurvePoint::new(10_000, 3000),
            CurvePoint::new(1_000, 2500),
        ])
        .unwrap();
        assert_eq!(curve.level_pptt(2000), 1_000);
        assert_eq!(curve.level_pptt(2500), 1_000);
    }

    #[test]
    fn test_wide_voltage_span() {
        let points = vec![CurvePoint::new(10_000, 1_000_000), CurvePoint::new(0, 0)];
        let curve = DischargeCurve::new(points).unwrap();
        assert_eq!(curve.level_pptt(500_000), 5_000);
        assert_eq!(curve.level_pptt(999_999), 9_999);
        assert_eq!(curve.percent(250_000), 25);

        let extreme = DischargeCurve::linear(i32::MAX, i32::MIN).unwrap();
        assert_eq!(extreme.level_pptt(0), 5_000);
    }

    #[test]
    fn test_single_point_curve() {
        let curve = DischargeCurve::new(vec![CurvePoint::new(8_000, 3000)]).unwrap();
        assert_eq!(curve.level_pptt(3100), 8_000);
        assert_eq!(curve.level_pptt(2900), 8_000);
    }

    #[test]
    fn test_monotonic_in_voltage() {
        let curves = [
            two_point(),
            DischargeCurve::new(vec![
                CurvePoint::new(10_000, 4200),
                CurvePoint::new(8_000, 4000),
                CurvePoint::new(6_250, 3900),
                CurvePoint::new(1_000, 3500),
                CurvePoint::new(1_000, 3400),
                CurvePoint::new(0, 3100),
            ])
            .unwrap(),
        ];

        for curve in &curves {
            let mut previous = curve.level_pptt(0);
            for mv in 1..5000 {
                let level = curve.level_pptt(mv);
                assert!(level >= previous, "{mv} mV: {level} < {previous}");
                previous = level;
            }
        }
    }

    #[test]
    fn test_curve_validation() {
        assert_eq!(DischargeCurve::new(vec![]), Err(CurveError::Empty));
        assert_eq!(
            DischargeCurve::linear(2700, 3200),
            Err(CurveError::NotDescending { index: 1 })
        );
        assert_eq!(
            DischargeCurve::new(vec![CurvePoint::new(5_000, 3000), CurvePoint::new(6_000, 2800)]),
            Err(CurveError::LevelIncreasing { index: 1 })
        );
        assert_eq!(
            DischargeCurve::new(vec![CurvePoint::new(10_001, 3000)]),
            Err(CurveError::LevelOutOfRange {
                index: 0,
                pptt: 10_001
            })
        );
    }

    #[test]
    fn test_curve_from_json() {
        let curve: DischargeCurve = serde_json::from_str(
            r#"[{"pptt":10000,"millivolts":3000},{"pptt":0,"millivolts":2000}]"#,
        )
        .unwrap();
        assert_eq!(curve.percent(2500), 50);

        let invalid = serde_json::from_str::<DischargeCurve>("[]");
        assert!(invalid.is_err());
    }

    #[test]
    fn test_sample_success() {
        let mut sampler = BatterySampler::new(ScriptedFrontEnd::millivolts(&[3000]), two_point());
        assert_eq!(sampler.state(), SamplerState::Idle);

        let reading = sampler.sample().unwrap();
        assert_eq!(reading.millivolts, 3000);
        assert_eq!(reading.percent, 60);
        assert_eq!(sampler.state(), SamplerState::Published);
        assert_eq!(sampler.front_end().enable_log, vec![true, false]);
    }

    #[test]
    fn test_read_failure_disables_sense() {
        let mut sampler = BatterySampler::new(
            ScriptedFrontEnd::new([Err(DriverError::ReadFailed(-5))]),
            two_point(),
        );

        assert!(sampler.sample().is_none());
        assert_eq!(sampler.state(), SamplerState::Failed);
        assert_eq!(sampler.front_end().enable_log, vec![true, false]);
    }

    #[test]
    fn test_negative_millivolts_rejected() {
        let mut sampler = BatterySampler::new(ScriptedFrontEnd::millivolts(&[-1]), two_point());
        assert!(sampler.sample().is_none());
        assert_eq!(sampler.state(), SamplerState::Failed);
    }

    #[test]
    fn test_enable_failure_still_disables() {
        let mut front_end = ScriptedFrontEnd::millivolts(&[3000]);
        front_end.fail_enable = true;
        let mut sampler = BatterySampler::new(front_end, two_point());

        assert!(sampler.sample().is_none());
        assert_eq!(sampler.front_end().enable_log, vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_cycles_publish_truncated_percentages() {
        let (publisher, mut inbox) = reading_channel("battery", 8);
        let sampler = BatterySampler::new(
            ScriptedFrontEnd::millivolts(&[3200, 3000, 2900, 2700, 2600]),
            two_point(),
        );
        let handle = tokio::spawn(sampler.run(
            publisher,
            DEFAULT_SAMPLE_PERIOD,
            Duration::from_millis(250),
        ));

        let mut percents = Vec::new();
        for _ in 0..5 {
            percents.push(inbox.recv().await.unwrap().percent);
        }
        assert_eq!(percents, vec![100, 60, 40, 0, 0]);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_publishes_nothing() {
        let (publisher, mut inbox) = reading_channel("battery", 8);
        let sampler = BatterySampler::new(
            ScriptedFrontEnd::new([Ok(3100), Err(DriverError::ReadFailed(-22)), Ok(2800)]),
            two_point(),
        );
        let handle = tokio::spawn(sampler.run(
            publisher,
            DEFAULT_SAMPLE_PERIOD,
            Duration::from_millis(250),
        ));

        // Cycles at 1 s, 2 s and 3 s; the second one fails
        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(inbox.try_recv().map(|r| r.millivolts), Some(3100));
        assert_eq!(inbox.try_recv().map(|r| r.millivolts), Some(2800));
        assert_eq!(inbox.try_recv(), None);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_consumer_gone() {
        let (publisher, inbox) = reading_channel("battery", 1);
        drop(inbox);
        let sampler = BatterySampler::new(ScriptedFrontEnd::millivolts(&[3000]), two_point());

        // Returns instead of looping forever
        sampler
            .run(publisher, DEFAULT_SAMPLE_PERIOD, Duration::from_millis(10))
            .await;
    }
}
