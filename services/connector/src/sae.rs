//! Streaming analytics message types.
//!
//! These are prost-generated types for `schemas/sae.proto`, checked in so the
//! crate builds without protoc. Keep in sync with the schema file.

/// One inbound analytics message: a video frame plus the detections found in it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SaeMessage {
    #[prost(message, optional, tag = "1")]
    pub frame: ::core::option::Option<VideoFrame>,
    #[prost(message, repeated, tag = "2")]
    pub detections: ::prost::alloc::vec::Vec<Detection>,
    #[prost(uint64, tag = "3")]
    pub timestamp_utc_ms: u64,
}

/// A single captured frame with its JPEG payload and capture metadata.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VideoFrame {
    #[prost(string, tag = "1")]
    pub source_id: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub timestamp_utc_ms: u64,
    #[prost(message, optional, tag = "3")]
    pub shape: ::core::option::Option<Shape>,
    #[prost(bytes = "vec", tag = "4")]
    pub frame_data_jpeg: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, optional, tag = "5")]
    pub camera_location: ::core::option::Option<GeoCoordinate>,
}

#[derive(Copy, Clone, PartialEq, ::prost::Message)]
pub struct Shape {
    #[prost(uint32, tag = "1")]
    pub height: u32,
    #[prost(uint32, tag = "2")]
    pub width: u32,
    #[prost(uint32, tag = "3")]
    pub channels: u32,
}

#[derive(Copy, Clone, PartialEq, ::prost::Message)]
pub struct GeoCoordinate {
    #[prost(double, tag = "1")]
    pub latitude: f64,
    #[prost(double, tag = "2")]
    pub longitude: f64,
}

/// One detected object within a frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Detection {
    #[prost(message, optional, tag = "1")]
    pub bounding_box: ::core::option::Option<BoundingBox>,
    #[prost(float, tag = "2")]
    pub confidence: f32,
    #[prost(int32, tag = "3")]
    pub class_id: i32,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub object_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(uint64, tag = "5")]
    pub timestamp_utc_ms: u64,
}

/// Corner coordinates normalized to `[0, 1]` relative to the frame dimensions.
#[derive(Copy, Clone, PartialEq, ::prost::Message)]
pub struct BoundingBox {
    #[prost(float, tag = "1")]
    pub min_x: f32,
    #[prost(float, tag = "2")]
    pub min_y: f32,
    #[prost(float, tag = "3")]
    pub max_x: f32,
    #[prost(float, tag = "4")]
    pub max_y: f32,
}
