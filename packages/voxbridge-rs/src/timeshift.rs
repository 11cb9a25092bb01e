use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::Volume;

/// Destination for volumes. Used to chain relay stages in front of a
/// renderer or server sink.
pub trait VolumeSink {
    fn send_volume(&mut self, volume: Volume);
}

const CLEANUP_RATIO: f64 = 0.25;

/// Relay sink that retains recent volumes per channel and can replay the
/// stream at a caller-controlled time shift.
///
/// Volumes are kept per channel in a timeline keyed by volume index. The
/// soft horizon is how far back seeking is expected to work; the hard
/// horizon is how far back anything is retained at all. A cleanup pass runs
/// every `soft_horizon * 0.25` timepoints and drops whatever fell behind
/// the hard horizon.
///
/// While playing, every incoming volume is forwarded through the configured
/// time shift. While paused, changing the shift re-emits the newly selected
/// volume on every available channel.
pub struct TimeShiftingSink<S> {
    relay: S,
    soft_horizon: i64,
    hard_horizon: i64,
    cleanup_period: i64,
    timelines: HashMap<i64, BTreeMap<i64, Volume>>,
    available_channels: BTreeSet<i64>,
    highest_index_seen: i64,
    time_shift: i64,
    playing: bool,
}

impl<S: VolumeSink> TimeShiftingSink<S> {
    pub fn new(relay: S, soft_horizon: i64, hard_horizon: i64) -> Self {
        let soft = soft_horizon.min(hard_horizon).max(1);
        let hard = hard_horizon.max(soft_horizon).max(1);
        Self {
            relay,
            soft_horizon: soft,
            hard_horizon: hard,
            cleanup_period: ((soft as f64 * CLEANUP_RATIO) as i64).max(1),
            timelines: HashMap::new(),
            available_channels: BTreeSet::new(),
            highest_index_seen: 0,
            time_shift: 0,
            playing: true,
        }
    }

    pub fn relay(&self) -> &S {
        &self.relay
    }

    pub fn soft_horizon(&self) -> i64 {
        self.soft_horizon
    }

    pub fn hard_horizon(&self) -> i64 {
        self.hard_horizon
    }

    pub fn time_shift(&self) -> i64 {
        self.time_shift
    }

    pub fn set_time_shift(&mut self, shift: i64) {
        self.time_shift = shift;
    }

    /// Seek by a normalized position in `[0, 1]`, where 0 is live and 1 is
    /// the oldest timepoint still within the hard horizon. When paused, a
    /// changed shift immediately re-emits the selected volume on every
    /// available channel.
    pub fn set_time_shift_normalized(&mut self, normalized: f64) {
        let previous = self.time_shift;
        let start = (self.highest_index_seen - self.hard_horizon).max(0);
        let interval = self.highest_index_seen - start;
        self.time_shift = -((interval as f64 * normalized).round() as i64);

        if !self.playing && previous != self.time_shift {
            let channels: Vec<i64> = self.available_channels.iter().copied().collect();
            for channel in channels {
                self.replay_channel(channel);
            }
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Highest volume index seen so far.
    pub fn number_of_timepoints(&self) -> i64 {
        self.highest_index_seen
    }

    pub fn available_channels(&self) -> usize {
        self.available_channels.len()
    }

    fn replay_channel(&mut self, channel: i64) {
        let selected = self.volume_to_send(channel).cloned();
        match selected {
            Some(volume) => self.relay.send_volume(volume),
            None => log::debug!("no volume available to send on channel {channel}"),
        }
    }

    /// The volume at or just before the shifted timepoint, falling back to
    /// the next one after it when the shift points before retained history.
    fn volume_to_send(&self, channel: i64) -> Option<&Volume> {
        let timeline = self.timelines.get(&channel)?;
        let target = self.highest_index_seen + self.time_shift;
        timeline
            .range(..=target)
            .next_back()
            .or_else(|| timeline.range(target..).next())
            .map(|(_, volume)| volume)
    }

    fn cleanup(&mut self, channel: i64) {
        if self.highest_index_seen % self.cleanup_period != 0 {
            return;
        }
        let cutoff = self.highest_index_seen - self.hard_horizon;
        if let Some(timeline) = self.timelines.get_mut(&channel) {
            *timeline = timeline.split_off(&cutoff);
            if timeline.is_empty() {
                self.timelines.remove(&channel);
                self.available_channels.remove(&channel);
            }
        }
    }
}

impl<S: VolumeSink> VolumeSink for TimeShiftingSink<S> {
    fn send_volume(&mut self, volume: Volume) {
        let channel = volume.channel;
        let index = volume.volume_index;

        self.available_channels.insert(channel);
        self.timelines.entry(channel).or_default().insert(index, volume);
        self.highest_index_seen = self.highest_index_seen.max(index);

        if self.playing {
            self.replay_channel(channel);
        }
        self.cleanup(channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementSize;

    #[derive(Default)]
    struct RecordingSink {
        received: Vec<Volume>,
    }

    impl VolumeSink for RecordingSink {
        fn send_volume(&mut self, volume: Volume) {
            self.received.push(volume);
        }
    }

    fn volume(channel: i64, index: i64) -> Volume {
        Volume {
            channel,
            data: vec![0u8; 8].into(),
            width: 2,
            height: 2,
            depth: 2,
            element_size: ElementSize::U8,
            voxel_dimensions: Default::default(),
            volume_index: index,
            volume_time: index as f64 * 0.1,
        }
    }

    #[test]
    fn forwards_live_volumes_while_playing() {
        let mut sink = TimeShiftingSink::new(RecordingSink::default(), 8, 16);
        for index in 0..4 {
            sink.send_volume(volume(0, index));
        }

        let received = &sink.relay().received;
        assert_eq!(received.len(), 4);
        assert_eq!(received.last().map(|v| v.volume_index), Some(3));
    }

    #[test]
    fn negative_shift_selects_past_volume() {
        let mut sink = TimeShiftingSink::new(RecordingSink::default(), 8, 16);
        for index in 0..=10 {
            sink.send_volume(volume(0, index));
        }

        sink.set_time_shift(-4);
        sink.send_volume(volume(0, 11));

        // Latest emission is the floor entry at index 11 - 4 = 7.
        assert_eq!(sink.relay().received.last().map(|v| v.volume_index), Some(7));
    }

    #[test]
    fn shift_before_history_falls_forward_to_oldest_retained() {
        let mut sink = TimeShiftingSink::new(RecordingSink::default(), 4, 4);
        for index in 0..=12 {
            sink.send_volume(volume(0, index));
        }

        sink.set_time_shift(-1000);
        sink.send_volume(volume(0, 13));

        let last = sink.relay().received.last().map(|v| v.volume_index).unwrap();
        // Everything behind the hard horizon is gone; the ceiling entry of
        // the retained timeline is emitted instead.
        assert!(last >= 12 - sink.hard_horizon());
    }

    #[test]
    fn hard_horizon_eviction_prunes_old_timepoints() {
        let mut sink = TimeShiftingSink::new(RecordingSink::default(), 4, 8);
        for index in 0..=32 {
            sink.send_volume(volume(0, index));
        }

        let timeline = sink.timelines.get(&0).unwrap();
        assert!(*timeline.keys().next().unwrap() >= 32 - sink.hard_horizon());
        assert!(timeline.contains_key(&32));
    }

    #[test]
    fn paused_seek_re_emits_selected_volume() {
        let mut sink = TimeShiftingSink::new(RecordingSink::default(), 8, 16);
        for index in 0..=10 {
            sink.send_volume(volume(0, index));
        }
        sink.pause();
        let before = sink.relay().received.len();

        sink.set_time_shift_normalized(0.5);

        let received = &sink.relay().received;
        assert_eq!(received.len(), before + 1);
        // interval is hard-horizon bounded: [0, 10], so 0.5 lands on index 5.
        assert_eq!(received.last().map(|v| v.volume_index), Some(5));
    }

    #[test]
    fn channels_are_tracked_independently() {
        let mut sink = TimeShiftingSink::new(RecordingSink::default(), 8, 16);
        sink.send_volume(volume(0, 0));
        sink.send_volume(volume(1, 0));
        sink.send_volume(volume(1, 1));

        assert_eq!(sink.available_channels(), 2);
        assert_eq!(sink.number_of_timepoints(), 1);
    }
}
