// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what the system works with:
// labelled 32x32 colour images and the ten CIFAR-10 classes.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// A single labelled image and the class vocabulary
pub mod image;

// Core abstractions (traits) that other layers implement
pub mod traits;
