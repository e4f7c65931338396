//! Tick execution

use crate::audio::SoundDevice;
use crate::timing::{Clock, FrameTiming};

use super::{Platform, Runtime, TickReport};

impl<D: SoundDevice, C: Clock> Runtime<D, C> {
    /// Run one tick: input, reload, update, audio, pace, present, swap.
    pub fn tick<P: Platform>(&mut self, platform: &mut P) -> TickReport {
        self.input.begin_frame(self.pacer.target_seconds());
        {
            let (old, new) = self.input.split();
            if platform.pump_events(old, new).is_break() {
                self.running = false;
            }
            for source in &mut self.sources {
                source.poll(old, new);
            }
        }

        let reloaded = self.reloader.poll();

        let module = self.reloader.module_mut();
        module.update_and_render(&mut self.memory, self.input.new_frame(), &mut self.frame);

        let audio_tick = self.audio.as_mut().map(|audio| {
            let seconds_since_flip = self.pacer.elapsed(&self.clock).as_secs_f32();
            let samples_per_second = audio.device.samples_per_second();
            let memory = &mut self.memory;
            audio.synchronizer.sync(&mut audio.device, seconds_since_flip, |samples| {
                module.get_sound_samples(memory, samples_per_second, samples)
            })
        });

        let timing = self.pacer.end_frame(&self.clock);

        let markers = match &mut self.audio {
            Some(audio) => {
                audio.synchronizer.record_flip(&mut audio.device);
                audio.synchronizer.markers()
            }
            None => None,
        };
        platform.present(&self.frame, markers);

        self.input.swap();

        let frame_index = self.frame_index;
        self.frame_index += 1;
        self.report(frame_index, &timing);

        TickReport {
            frame_index,
            timing,
            audio: audio_tick,
            reloaded,
            running: self.running,
        }
    }

    /// Tick until the platform asks to stop. Returns the number of ticks run.
    pub fn run<P: Platform>(&mut self, platform: &mut P) -> u64 {
        let start = self.frame_index;
        while self.running {
            self.tick(platform);
        }
        tracing::info!("Main loop stopped after {} frames", self.frame_index - start);
        self.frame_index - start
    }

    /// Tick at most `frames` times, stopping early if the platform asks to.
    pub fn run_frames<P: Platform>(&mut self, platform: &mut P, frames: u64) -> u64 {
        let start = self.frame_index;
        while self.running && self.frame_index - start < frames {
            self.tick(platform);
        }
        self.frame_index - start
    }

    fn report(&self, frame_index: u64, timing: &FrameTiming) {
        let every = self.config.timing.report_every_frames as u64;
        if every == 0 || (frame_index + 1) % every != 0 {
            return;
        }
        tracing::trace!(
            "{:.2} ms/f, {:.2} fps, {:.2} Mc/f, {} missed",
            timing.ms_per_frame(),
            timing.fps(),
            timing.mcycles_per_frame(),
            self.pacer.missed_frames()
        );
    }
}
