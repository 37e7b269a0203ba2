//! The 21-class PASCAL VOC taxonomy used by MobileNet-SSD models.

/// Label for each class id; index 0 is the background class.
pub const VOC_CLASSES: [&str; 21] = [
    "background",
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

pub const PERSON_CLASS_ID: u32 = 15;

pub fn class_label(class_id: u32) -> Option<&'static str> {
    VOC_CLASSES.get(class_id as usize).copied()
}

/// Case-insensitive lookup of a class id by label.
pub fn class_id_for(label: &str) -> Option<u32> {
    let label = label.trim();
    VOC_CLASSES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(label))
        .map(|idx| idx as u32)
}
