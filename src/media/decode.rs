//! Frame decoding with a streaming primary path and a seek-exact fallback.
//!
//! The primary decoder keeps one long-lived `ffmpeg` child per asset and
//! reads sequential rawvideo frames from its stdout, which is cheap while the
//! consumer advances monotonically (playback, offline export). The fallback
//! spawns one exact-seek `ffmpeg` per requested frame, which is slow but
//! stateless and survives sources the streaming path chokes on.
//!
//! [`AssetDecoder`] arbitrates between the two with an explicit failover
//! state machine so a flaky source degrades to correct-but-slow output
//! instead of failing the whole render.

use std::collections::HashMap;
use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::{CutError, CutResult, Fps};
use crate::media::probe::{MediaInfo, probe_media};
use crate::model::{AssetId, MediaAsset};

/// Consecutive primary-path failures after which an asset is pinned to the
/// fallback decoder for the rest of the session.
pub const FAILOVER_THRESHOLD: u32 = 3;

/// Anything that can produce an RGBA8 frame at a media-local time.
pub trait VideoFrameSource: Send {
    /// Decode the frame covering `source_time_sec`, straight-alpha RGBA8.
    fn frame_rgba8(&mut self, source_time_sec: f64) -> CutResult<Vec<u8>>;
    /// Source pixel dimensions.
    fn dimensions(&self) -> (u32, u32);
    /// Release long-lived resources (child processes, pipes) now instead of
    /// waiting for drop. The source stays usable; the next `frame_rgba8`
    /// re-primes whatever it needs.
    fn dispose(&mut self) {}
}

/// Which decode path an asset is currently served from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeMode {
    /// Streaming decoder, healthy.
    Primary,
    /// Streaming decoder failed recently; still retried each frame.
    Degrading {
        /// Consecutive failures so far.
        failures: u32,
    },
    /// Pinned to the seek-exact decoder. Terminal for the session.
    Fallback,
}

/// Streaming decoder: one long-lived ffmpeg child read sequentially.
pub struct StreamDecoder {
    info: MediaInfo,
    fps: Fps,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    /// Media time the next stdout frame corresponds to.
    next_time_sec: f64,
    /// Last frame read, held when the source is exhausted.
    last: Option<Vec<u8>>,
}

/// Forward jump, in frames, beyond which re-spawning beats skip-reading.
const MAX_SKIP_FRAMES: u64 = 120;

impl StreamDecoder {
    /// Create a streaming decoder reading at the consumer's frame rate.
    pub fn new(info: MediaInfo, fps: Fps) -> Self {
        Self {
            info,
            fps,
            child: None,
            stdout: None,
            next_time_sec: 0.0,
            last: None,
        }
    }

    fn frame_len(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 4
    }

    /// Spawn ffmpeg at `start_sec` with a fast keyframe seek. `-ss` before
    /// `-i` lands on the preceding keyframe, which is fine because frames are
    /// then consumed sequentially from there.
    fn spawn(&mut self, start_sec: f64) -> CutResult<()> {
        self.shutdown();
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{start_sec:.9}")])
            .arg("-i")
            .arg(&self.info.source_path)
            .args([
                "-r",
                &format!("{}/{}", self.fps.num, self.fps.den),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CutError::decode(format!("failed to spawn ffmpeg stream: {e}")))?;
        self.stdout = child.stdout.take();
        self.child = Some(child);
        self.next_time_sec = start_sec;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn read_one(&mut self) -> CutResult<Option<Vec<u8>>> {
        let len = self.frame_len();
        if len == 0 {
            return Err(CutError::decode("source has zero-sized video frames"));
        }
        let Some(stdout) = self.stdout.as_mut() else {
            return Err(CutError::decode("streaming decoder has no open pipe"));
        };
        let mut buf = vec![0u8; len];
        match stdout.read_exact(&mut buf) {
            Ok(()) => {
                self.next_time_sec += self.fps.frame_duration_secs();
                Ok(Some(buf))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(CutError::decode(format!("ffmpeg stream read failed: {e}"))),
        }
    }
}

impl VideoFrameSource for StreamDecoder {
    fn frame_rgba8(&mut self, source_time_sec: f64) -> CutResult<Vec<u8>> {
        let step = self.fps.frame_duration_secs();
        let backwards = source_time_sec < self.next_time_sec - step * 0.5;
        let too_far = source_time_sec - self.next_time_sec > step * MAX_SKIP_FRAMES as f64;
        if self.child.is_none() || backwards || too_far {
            self.spawn(source_time_sec.max(0.0))?;
        }

        // Skip-read until the pending frame covers the requested instant.
        loop {
            if self.next_time_sec > source_time_sec - step * 0.5 {
                match self.read_one()? {
                    Some(frame) => {
                        self.last = Some(frame.clone());
                        return Ok(frame);
                    }
                    // Exhausted: hold the last decoded frame. This is what
                    // lets an outgoing transition clip run past its media end.
                    None => {
                        return self.last.clone().ok_or_else(|| {
                            CutError::decode(format!(
                                "ffmpeg produced no frames for '{}'",
                                self.info.source_path.display()
                            ))
                        });
                    }
                }
            }
            match self.read_one()? {
                Some(frame) => self.last = Some(frame),
                None => {
                    return self.last.clone().ok_or_else(|| {
                        CutError::decode(format!(
                            "ffmpeg produced no frames for '{}'",
                            self.info.source_path.display()
                        ))
                    });
                }
            }
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn dispose(&mut self) {
        self.shutdown();
    }
}

impl Drop for StreamDecoder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fallback decoder: one exact-seek ffmpeg invocation per frame.
pub struct SeekDecoder {
    info: MediaInfo,
    last: Option<Vec<u8>>,
}

impl SeekDecoder {
    /// Create a seek-exact decoder for a probed source.
    pub fn new(info: MediaInfo) -> Self {
        Self { info, last: None }
    }
}

impl VideoFrameSource for SeekDecoder {
    fn frame_rgba8(&mut self, source_time_sec: f64) -> CutResult<Vec<u8>> {
        // `-ss` after `-i` decodes up to the exact requested instant.
        let out = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.info.source_path)
            .args([
                "-ss",
                &format!("{:.9}", source_time_sec.max(0.0)),
                "-frames:v",
                "1",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .output()
            .map_err(|e| CutError::decode(format!("failed to run ffmpeg seek decode: {e}")))?;
        if !out.status.success() {
            return Err(CutError::decode(format!(
                "ffmpeg seek decode failed for '{}': {}",
                self.info.source_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let expected = self.info.width as usize * self.info.height as usize * 4;
        if expected == 0 {
            return Err(CutError::decode("source has zero-sized video frames"));
        }
        if out.stdout.len() >= expected {
            let frame = out.stdout[..expected].to_vec();
            self.last = Some(frame.clone());
            return Ok(frame);
        }
        // Past the end of the source: hold the last frame.
        self.last.clone().ok_or_else(|| {
            CutError::decode(format!(
                "ffmpeg returned no frame for '{}' at {source_time_sec:.3}s",
                self.info.source_path.display()
            ))
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }
}

/// Primary/fallback pair for one asset with the failover state machine.
pub struct AssetDecoder {
    primary: Box<dyn VideoFrameSource>,
    fallback: Box<dyn VideoFrameSource>,
    mode: DecodeMode,
}

impl AssetDecoder {
    /// Pair an arbitrary primary and fallback source. Tests inject stubs
    /// here; production pairs a [`StreamDecoder`] with a [`SeekDecoder`].
    pub fn new(
        primary: Box<dyn VideoFrameSource>,
        fallback: Box<dyn VideoFrameSource>,
    ) -> Self {
        Self {
            primary,
            fallback,
            mode: DecodeMode::Primary,
        }
    }

    /// Build the production decoder pair for a probed source.
    pub fn for_source(info: MediaInfo, fps: Fps) -> Self {
        Self::new(
            Box::new(StreamDecoder::new(info.clone(), fps)),
            Box::new(SeekDecoder::new(info)),
        )
    }

    /// Current decode path.
    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Pin this asset to the fallback path and release the primary decoder's
    /// resources. Idempotent.
    pub fn force_fallback(&mut self) {
        if self.mode != DecodeMode::Fallback {
            self.primary.dispose();
            self.mode = DecodeMode::Fallback;
        }
    }

    /// Source pixel dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        self.primary.dimensions()
    }

    /// Decode the frame at `source_time_sec`, arbitrating between paths.
    ///
    /// A primary failure serves the frame from the fallback and records the
    /// failure; [`FAILOVER_THRESHOLD`] consecutive failures pin the asset to
    /// the fallback. A primary success while degrading resets to healthy.
    pub fn frame_rgba8(&mut self, source_time_sec: f64) -> CutResult<Vec<u8>> {
        if self.mode == DecodeMode::Fallback {
            return self.fallback.frame_rgba8(source_time_sec);
        }
        match self.primary.frame_rgba8(source_time_sec) {
            Ok(frame) => {
                if !matches!(self.mode, DecodeMode::Primary) {
                    tracing::debug!("streaming decoder recovered");
                    self.mode = DecodeMode::Primary;
                }
                Ok(frame)
            }
            Err(e) => {
                let failures = match self.mode {
                    DecodeMode::Degrading { failures } => failures + 1,
                    _ => 1,
                };
                if failures >= FAILOVER_THRESHOLD {
                    tracing::warn!(%e, failures, "streaming decoder pinned to fallback");
                    self.primary.dispose();
                    self.mode = DecodeMode::Fallback;
                } else {
                    tracing::debug!(%e, failures, "streaming decode failed, serving fallback");
                    self.mode = DecodeMode::Degrading { failures };
                }
                self.fallback.frame_rgba8(source_time_sec)
            }
        }
    }
}

/// Per-asset decoder pool shared by playback and export.
///
/// The farm compounds the per-asset failover: once any one asset pins itself
/// to the fallback path, every other open decoder is demoted too and later
/// opens start out pinned. A source flaky enough to exhaust the streaming
/// path tends to indicate an environment problem (codec support, pipe
/// pressure) rather than one bad file, and mixing paths mid-run would leave
/// idle streaming children holding pipes nobody reads.
#[derive(Default)]
pub struct DecodeFarm {
    slots: HashMap<AssetId, AssetDecoder>,
    fallback_only: bool,
}

impl DecodeFarm {
    /// Create an empty farm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe an asset's source and open its decoder pair. Re-opening an
    /// already open asset is a no-op.
    pub fn open(&mut self, asset: &MediaAsset, fps: Fps) -> CutResult<()> {
        if self.slots.contains_key(&asset.id) {
            return Ok(());
        }
        let info = probe_media(&asset.source)?;
        if !info.has_video {
            return Err(CutError::decode(format!(
                "'{}' has no video stream",
                asset.source.display()
            )));
        }
        let mut decoder = AssetDecoder::for_source(info, fps);
        if self.fallback_only {
            decoder.force_fallback();
        }
        self.slots.insert(asset.id, decoder);
        Ok(())
    }

    /// Inject a pre-built decoder, used by tests and still-image sources.
    pub fn insert(&mut self, asset_id: AssetId, mut decoder: AssetDecoder) {
        if self.fallback_only {
            decoder.force_fallback();
        }
        self.slots.insert(asset_id, decoder);
    }

    /// Decode a frame for an open asset.
    pub fn frame_rgba8(&mut self, asset_id: AssetId, source_time_sec: f64) -> CutResult<Vec<u8>> {
        let Some(slot) = self.slots.get_mut(&asset_id) else {
            return Err(CutError::decode(format!(
                "no decoder open for asset {asset_id}"
            )));
        };
        let frame = slot.frame_rgba8(source_time_sec);
        if !self.fallback_only && slot.mode() == DecodeMode::Fallback {
            tracing::warn!(%asset_id, "demoting every open decoder to the fallback path");
            self.fallback_only = true;
            for slot in self.slots.values_mut() {
                slot.force_fallback();
            }
        }
        frame
    }

    /// Whether the whole farm has been demoted to the fallback path.
    pub fn fallback_only(&self) -> bool {
        self.fallback_only
    }

    /// Decode path for an open asset.
    pub fn mode(&self, asset_id: AssetId) -> Option<DecodeMode> {
        self.slots.get(&asset_id).map(|s| s.mode())
    }

    /// Dimensions for an open asset.
    pub fn dimensions(&self, asset_id: AssetId) -> Option<(u32, u32)> {
        self.slots.get(&asset_id).map(|s| s.dimensions())
    }

    /// Drop all open decoders and their child processes. Ends the run, so a
    /// farm-wide demotion is forgotten too.
    pub fn close_all(&mut self) {
        self.slots.clear();
        self.fallback_only = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted source: fails the first `fail_first` requests, then succeeds.
    struct Scripted {
        fail_first: u32,
        calls: u32,
        fill: u8,
    }

    impl Scripted {
        fn new(fail_first: u32, fill: u8) -> Self {
            Self {
                fail_first,
                calls: 0,
                fill,
            }
        }
    }

    impl VideoFrameSource for Scripted {
        fn frame_rgba8(&mut self, _t: f64) -> CutResult<Vec<u8>> {
            self.calls += 1;
            if self.calls <= self.fail_first {
                Err(CutError::decode("scripted failure"))
            } else {
                Ok(vec![self.fill; 4])
            }
        }

        fn dimensions(&self) -> (u32, u32) {
            (1, 1)
        }
    }

    #[test]
    fn healthy_primary_stays_primary() {
        let mut d = AssetDecoder::new(
            Box::new(Scripted::new(0, 1)),
            Box::new(Scripted::new(0, 2)),
        );
        assert_eq!(d.frame_rgba8(0.0).unwrap(), vec![1; 4]);
        assert_eq!(d.mode(), DecodeMode::Primary);
    }

    #[test]
    fn failure_serves_fallback_and_degrades() {
        let mut d = AssetDecoder::new(
            Box::new(Scripted::new(1, 1)),
            Box::new(Scripted::new(0, 2)),
        );
        // First request: primary fails, frame still comes from the fallback.
        assert_eq!(d.frame_rgba8(0.0).unwrap(), vec![2; 4]);
        assert_eq!(d.mode(), DecodeMode::Degrading { failures: 1 });
        // Second request: primary recovers, mode resets.
        assert_eq!(d.frame_rgba8(0.1).unwrap(), vec![1; 4]);
        assert_eq!(d.mode(), DecodeMode::Primary);
    }

    #[test]
    fn threshold_failures_pin_to_fallback() {
        let mut d = AssetDecoder::new(
            Box::new(Scripted::new(u32::MAX, 1)),
            Box::new(Scripted::new(0, 2)),
        );
        for _ in 0..FAILOVER_THRESHOLD {
            assert_eq!(d.frame_rgba8(0.0).unwrap(), vec![2; 4]);
        }
        assert_eq!(d.mode(), DecodeMode::Fallback);
    }

    #[test]
    fn fallback_is_terminal() {
        // Primary would recover after 3 calls, but by then it is never
        // consulted again.
        let mut d = AssetDecoder::new(
            Box::new(Scripted::new(3, 1)),
            Box::new(Scripted::new(0, 2)),
        );
        for _ in 0..FAILOVER_THRESHOLD + 5 {
            assert_eq!(d.frame_rgba8(0.0).unwrap(), vec![2; 4]);
        }
        assert_eq!(d.mode(), DecodeMode::Fallback);
    }

    #[test]
    fn farm_routes_by_asset_id() {
        let mut farm = DecodeFarm::new();
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        farm.insert(
            a,
            AssetDecoder::new(Box::new(Scripted::new(0, 10)), Box::new(Scripted::new(0, 0))),
        );
        farm.insert(
            b,
            AssetDecoder::new(Box::new(Scripted::new(0, 20)), Box::new(Scripted::new(0, 0))),
        );
        assert_eq!(farm.frame_rgba8(a, 0.0).unwrap(), vec![10; 4]);
        assert_eq!(farm.frame_rgba8(b, 0.0).unwrap(), vec![20; 4]);
        assert!(farm.frame_rgba8(uuid::Uuid::new_v4(), 0.0).is_err());
    }

    #[test]
    fn one_pinned_asset_demotes_the_whole_farm() {
        let mut farm = DecodeFarm::new();
        let flaky = uuid::Uuid::new_v4();
        let healthy = uuid::Uuid::new_v4();
        farm.insert(
            flaky,
            AssetDecoder::new(
                Box::new(Scripted::new(u32::MAX, 1)),
                Box::new(Scripted::new(0, 2)),
            ),
        );
        farm.insert(
            healthy,
            AssetDecoder::new(Box::new(Scripted::new(0, 10)), Box::new(Scripted::new(0, 20))),
        );

        for _ in 0..FAILOVER_THRESHOLD {
            assert_eq!(farm.frame_rgba8(flaky, 0.0).unwrap(), vec![2; 4]);
        }
        assert!(farm.fallback_only());
        assert_eq!(farm.mode(healthy), Some(DecodeMode::Fallback));
        // The healthy asset is now served from its fallback pair too.
        assert_eq!(farm.frame_rgba8(healthy, 0.0).unwrap(), vec![20; 4]);

        // Decoders opened after the demotion start out pinned.
        let late = uuid::Uuid::new_v4();
        farm.insert(
            late,
            AssetDecoder::new(Box::new(Scripted::new(0, 30)), Box::new(Scripted::new(0, 40))),
        );
        assert_eq!(farm.frame_rgba8(late, 0.0).unwrap(), vec![40; 4]);

        // Closing out the run clears the demotion.
        farm.close_all();
        assert!(!farm.fallback_only());
    }

    #[test]
    fn forcing_fallback_releases_the_primary() {
        let mut d = AssetDecoder::new(
            Box::new(Scripted::new(0, 1)),
            Box::new(Scripted::new(0, 2)),
        );
        d.force_fallback();
        assert_eq!(d.mode(), DecodeMode::Fallback);
        assert_eq!(d.frame_rgba8(0.0).unwrap(), vec![2; 4]);
    }
}
