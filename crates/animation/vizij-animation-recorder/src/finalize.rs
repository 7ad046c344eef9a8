//! Turns the raw buffers of a finished recording into the destination asset.

use std::sync::Arc;
use std::time::Instant;

use crate::asset::{AnimationAsset, CurveKey};
use crate::config::RecorderConfig;
use crate::curves::{CurveFrame, CurveIdentityTable};
use crate::outputs::{RecorderEvent, RecordingSummary};
use crate::session::{ActiveRecording, RawBoneTrack};
use crate::skeleton::Skeleton;
use crate::store::AssetStore;

/// Number of keys and clip length in seconds for `frame_count` captured frames.
///
/// A single-key clip still spans one frame interval.
pub fn clip_extent(cfg: &RecorderConfig, frame_count: u32) -> (u32, f32) {
    let key_count = frame_count.max(1);
    let intervals = if key_count > 1 { key_count - 1 } else { 1 };
    (key_count, cfg.recording_rate.as_seconds(intervals) as f32)
}

pub(crate) fn finalize<S: AssetStore>(
    active: ActiveRecording,
    cfg: &RecorderConfig,
    store: &mut S,
    show_notification: bool,
    events: &mut Vec<RecorderEvent>,
) -> AnimationAsset {
    let ActiveRecording {
        mut transaction,
        skeleton,
        tracks,
        frame_count,
        root,
        curves,
        ..
    } = active;

    let (key_count, play_length) = clip_extent(cfg, frame_count);
    {
        let asset = transaction.asset_mut();
        asset.interpolation = cfg.interpolation;
        asset.frame_rate = cfg.recording_rate;
        asset.key_count = key_count;
        asset.play_length = play_length;
        asset.root_offset = root.offset;

        match curves.table() {
            Some(table) if curves.len() == key_count as usize => {
                write_curves(asset, &skeleton, table, curves.frames(), cfg, events);
            }
            Some(_) => log::debug!(
                "curve frames ({}) do not line up with {key_count} key(s), curves not written",
                curves.len()
            ),
            None => {}
        }

        write_bone_tracks(asset, tracks, cfg, events);
        if !cfg.record_transforms {
            asset.remove_all_bone_tracks();
        }
    }

    let mut asset = transaction.commit();
    asset.mark_modified();

    if cfg.auto_save_asset {
        save(store, &mut asset, events);
    }

    let summary = RecordingSummary {
        asset: asset.name.clone(),
        key_count,
        play_length,
        frame_rate: cfg.recording_rate,
    };
    if show_notification {
        log::info!("{summary}");
        events.push(RecorderEvent::RecordingCompleted(summary));
    } else {
        log::debug!("{summary}");
    }
    asset
}

fn write_curves(
    asset: &mut AnimationAsset,
    skeleton: &Skeleton,
    table: &Arc<CurveIdentityTable>,
    frames: &[CurveFrame],
    cfg: &RecorderConfig,
    events: &mut Vec<RecorderEvent>,
) {
    let started = Instant::now();
    for (uid, slot) in table.entries() {
        let Some(meta) = skeleton.curve(uid) else {
            log::debug!("curve uid {} has no skeleton metadata, skipped", uid.0);
            events.push(RecorderEvent::CurveSkipped { uid: uid.0, name: None });
            continue;
        };
        if !cfg.records_category(meta.category) || cfg.name_exclusion.matches(&meta.name) {
            log::info!("skipping curve: {}", meta.name);
            events.push(RecorderEvent::CurveSkipped {
                uid: uid.0,
                name: Some(meta.name.clone()),
            });
            continue;
        }

        let keys: Vec<CurveKey> = frames
            .iter()
            .filter_map(|frame| {
                frame.value(slot).map(|value| CurveKey {
                    time: cfg.recording_rate.as_seconds(frame.frame) as f32,
                    value,
                    interp: cfg.curve_interp_mode,
                    tangent: cfg.tangent_mode,
                })
            })
            .collect();
        // A curve that never had a valid value gets no channel.
        if keys.is_empty() {
            continue;
        }
        let index = asset.add_curve(&meta.name);
        asset.set_curve_keys(index, keys);
    }
    log::info!("set curve keys in {:.3} seconds", started.elapsed().as_secs_f64());
}

fn write_bone_tracks(
    asset: &mut AnimationAsset,
    tracks: Vec<RawBoneTrack>,
    cfg: &RecorderConfig,
    events: &mut Vec<RecorderEvent>,
) {
    for track in tracks {
        let keys = if cfg.name_exclusion.matches(&track.name) {
            log::info!("skipping bone motion: {}", track.name);
            events.push(RecorderEvent::BoneMotionDiscarded {
                bone: track.name.clone(),
            });
            track.keys.first_only()
        } else {
            track.keys
        };
        if !asset.set_bone_track_keys(&track.name, keys) {
            log::warn!("bone track '{}' vanished from {}", track.name, asset.path());
        }
    }
}

fn save<S: AssetStore>(store: &mut S, asset: &mut AnimationAsset, events: &mut Vec<RecorderEvent>) {
    let started = Instant::now();
    let path = asset.path();
    match store.persist(asset) {
        Ok(()) => {
            let seconds = started.elapsed().as_secs_f64();
            asset.clear_modified();
            log::info!("saved {path} in {seconds:.3} seconds");
            events.push(RecorderEvent::AssetSaved { asset: path, seconds });
        }
        Err(err) => {
            log::warn!("failed to save {path}: {err}");
            events.push(RecorderEvent::PersistenceFailed {
                asset: path,
                reason: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::FrameRate;

    #[test]
    fn extent_of_multi_key_clip() {
        let (keys, len) = clip_extent(&RecorderConfig::default(), 4);
        assert_eq!(keys, 4);
        assert!((len - 0.1).abs() < 1e-6);
    }

    #[test]
    fn single_key_clip_spans_one_interval() {
        let cfg = RecorderConfig {
            recording_rate: FrameRate::fps(60),
            ..RecorderConfig::default()
        };
        let (keys, len) = clip_extent(&cfg, 1);
        assert_eq!(keys, 1);
        assert!((len - 1.0 / 60.0).abs() < 1e-6);
        // No frames at all still yields a one-key clip.
        assert_eq!(clip_extent(&cfg, 0).0, 1);
    }
}
