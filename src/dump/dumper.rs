use crate::dump::DumpTarget;
use crate::dump::results::{AlgorithmResult, BoundingBoxesResult};
use crate::json::{Container, JsonWriter};

/// Per-frame performance counters sent alongside the results.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    /// Frame rate the pipeline is configured for.
    pub target_fps: i32,
    /// Frame sequence number. Not part of the document.
    pub frame: i64,
    /// Whether results came from the FPGA path.
    pub fpga: bool,
    /// CPU utilization in percent.
    pub cpu_use: f64,
    /// Measured frame rate.
    pub framerate: f64,
    /// Processing time for this frame, in milliseconds.
    pub frame_time_ms: i32,
}

/// Serializes frame telemetry and hands it to a [`DumpTarget`].
pub struct Dumper {
    target: Box<dyn DumpTarget>,
}

impl Dumper {
    pub fn new(target: Box<dyn DumpTarget>) -> Self {
        Self { target }
    }

    /// Renders one frame and queues it on the target. Does not wait for delivery.
    pub fn accept(&self, results: &[AlgorithmResult], stats: &FrameStats) {
        let doc = Self::render(results, stats);
        tracing::trace!(bytes = doc.len(), frame = stats.frame, "dumping frame");
        self.target.write(doc.as_bytes());
    }

    /// The newline-terminated JSON document for one frame.
    pub fn render(results: &[AlgorithmResult], stats: &FrameStats) -> String {
        let mut buf = Vec::with_capacity(256);
        {
            let mut json = JsonWriter::with_root(&mut buf, Container::Object);

            json.object_field("frame");
            json.field("fps", &stats.target_fps);
            json.field("fpga", &stats.fpga);

            json.object_field("perf");
            json.field("cpu_use", &stats.cpu_use);
            json.field("fps", &stats.framerate);
            json.field("fr_time", &stats.frame_time_ms);
            json.end();

            json.array_field("results");
            for result in results {
                match result {
                    AlgorithmResult::BoundingBoxes(boxes) => write_bounding_boxes(&mut json, boxes),
                    AlgorithmResult::Points(_) | AlgorithmResult::Classification(_) => {}
                }
            }
            json.finish();
        }
        // Only UTF-8 input reaches the buffer.
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn write_bounding_boxes(json: &mut JsonWriter<'_, Vec<u8>>, result: &BoundingBoxesResult) {
    json.object();
    json.field("type", "bounding-boxes");
    json.array_field("boxes");

    for bbox in &result.boxes {
        json.object();
        if bbox.id != 0 {
            json.field("id", &bbox.id);
        }
        if bbox.tag != 0 {
            json.field("tag", &bbox.tag);
        }

        let (x, y) = bbox.bounds.top_left();
        json.object_field("topleft");
        json.field("x", &x);
        json.field("y", &y);
        json.end();

        let (x, y) = bbox.bounds.bottom_right();
        json.object_field("btmright");
        json.field("x", &x);
        json.field("y", &y);
        json.end();

        json.field("area", &bbox.bounds.area());
        json.end();
    }

    json.end();
    json.end();
}
