const SOUVENIR_LABELS: [&str; 21] = [
    "Aromatherapy Candle",
    "Balinese Topeng",
    "Barong T-shirt",
    "Beach Hat Bali",
    "Beach Sarong",
    "Beads Bracelet",
    "Bintang T-shirt",
    "Coconut Shell Candle Holder",
    "Crochet Bag",
    "Dream Catcher",
    "Hair Clip",
    "Handy Fan",
    "Keben (Balinese Woven Box)",
    "Keychain",
    "Rattan bag",
    "Silver Earrings",
    "Tridatu Bracelet",
    "Udeng (Balinese Headgear)",
    "Wall Decoration",
    "Wooden Earrings",
    "Woven Bag",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassLabelTable {
    labels: &'static [&'static str],
}

impl ClassLabelTable {
    pub const fn souvenirs() -> Self {
        Self {
            labels: &SOUVENIR_LABELS,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'static str> {
        self.labels.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.labels.iter().copied()
    }
}

impl Default for ClassLabelTable {
    fn default() -> Self {
        Self::souvenirs()
    }
}
