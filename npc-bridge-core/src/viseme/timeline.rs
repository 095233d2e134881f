//! Grouping of viseme frames into utterance segments.
//!
//! ```text
//! frame stream:   S a b c  S d e      (S = sil channel == -2)
//! timeline:      [[S a b c], [S d e]]
//! ```
//!
//! The sentinel frame is stored as the first pose of the segment it opens.
//! Frames that arrive before any sentinel have no segment to join and are
//! dropped.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::VisemePose;

/// One continuous run of poses for a spoken phrase.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UtteranceSegment {
    poses: Vec<VisemePose>,
}

impl UtteranceSegment {
    pub fn poses(&self) -> &[VisemePose] {
        &self.poses
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

/// What [`FaceTimeline::append`] did with a pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Sentinel pose: a new segment was opened with it as first element.
    StartedSegment,
    /// Added to the most recent segment.
    Appended,
    /// No segment exists yet; the pose was discarded.
    Dropped,
}

/// Ordered list of utterance segments consumed by the lip-sync animator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FaceTimeline {
    segments: Vec<UtteranceSegment>,
}

impl FaceTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one pose into the timeline.
    pub fn append(&mut self, pose: VisemePose) -> AppendOutcome {
        if pose.is_segment_start() {
            self.segments.push(UtteranceSegment { poses: vec![pose] });
            return AppendOutcome::StartedSegment;
        }

        match self.segments.last_mut() {
            Some(segment) => {
                segment.poses.push(pose);
                AppendOutcome::Appended
            }
            None => {
                debug!("viseme frame before first segment start, dropped");
                AppendOutcome::Dropped
            }
        }
    }

    pub fn segments(&self) -> &[UtteranceSegment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&UtteranceSegment> {
        self.segments.last()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total poses across all segments.
    pub fn frame_count(&self) -> usize {
        self.segments.iter().map(UtteranceSegment::len).sum()
    }

    /// Hand every segment to the animator and start over.
    pub fn take_segments(&mut self) -> Vec<UtteranceSegment> {
        std::mem::take(&mut self.segments)
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }
}

/// Shared handle to a [`FaceTimeline`]. The controller writes, the animator
/// reads.
#[derive(Debug, Clone, Default)]
pub struct TimelineHandle(pub Arc<Mutex<FaceTimeline>>);

impl TimelineHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, pose: VisemePose) -> AppendOutcome {
        self.0.lock().append(pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viseme::{parse_viseme, SILENCE_SENTINEL};

    fn sentinel() -> VisemePose {
        parse_viseme("[-2,0,0,0,0,0,0,0,0,0,0,0,0,0,0]")
    }

    fn frame(aa: f32) -> VisemePose {
        parse_viseme(&format!("[0,0,0,0,0,0,0,0,0,0,{aa}]"))
    }

    #[test]
    fn frame_before_sentinel_is_dropped() {
        let mut tl = FaceTimeline::new();
        assert_eq!(tl.append(frame(0.5)), AppendOutcome::Dropped);
        assert!(tl.is_empty());
    }

    #[test]
    fn sentinel_opens_segment_and_is_kept() {
        let mut tl = FaceTimeline::new();
        assert_eq!(tl.append(sentinel()), AppendOutcome::StartedSegment);
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.segments()[0].len(), 1);
        assert_eq!(tl.segments()[0].poses()[0].silence(), SILENCE_SENTINEL);
    }

    #[test]
    fn n_frames_after_sentinel_make_one_segment_of_n_plus_one() {
        let mut tl = FaceTimeline::new();
        tl.append(sentinel());
        for i in 0..7 {
            assert_eq!(tl.append(frame(i as f32 * 0.1)), AppendOutcome::Appended);
        }
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.segments()[0].len(), 8);
        assert_eq!(tl.frame_count(), 8);
    }

    #[test]
    fn second_sentinel_opens_new_segment() {
        let mut tl = FaceTimeline::new();
        tl.append(sentinel());
        tl.append(frame(0.1));
        tl.append(frame(0.2));
        tl.append(sentinel());
        tl.append(frame(0.3));

        assert_eq!(tl.len(), 2);
        assert_eq!(tl.segments()[0].len(), 3);
        assert_eq!(tl.last().unwrap().len(), 2);
    }

    #[test]
    fn consecutive_sentinels_open_single_pose_segments() {
        let mut tl = FaceTimeline::new();
        tl.append(sentinel());
        tl.append(sentinel());
        assert_eq!(tl.len(), 2);
        assert!(tl.segments().iter().all(|s| s.len() == 1));
    }

    #[test]
    fn take_segments_empties_timeline() {
        let mut tl = FaceTimeline::new();
        tl.append(sentinel());
        tl.append(frame(0.4));
        let taken = tl.take_segments();
        assert_eq!(taken.len(), 1);
        assert!(tl.is_empty());
        assert_eq!(tl.append(frame(0.4)), AppendOutcome::Dropped);
    }

    #[test]
    fn handle_shares_timeline() {
        let handle = TimelineHandle::new();
        let animator = handle.clone();
        handle.append(sentinel());
        handle.append(frame(0.9));
        assert_eq!(animator.0.lock().frame_count(), 2);
    }
}
