use serde::{Deserialize, Serialize};

use crate::ShapeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	Accommodation,
	ClothingAndAccessories,
	EverythingElse,
	FoodAndDrinkContainers,
	FurnitureAndAppliances,
	SportsAndFitness,
	TechAndGadgets,
	TextbooksAndStudyMaterials,
}
impl Category {
	pub const ALL: [Self; 8] = [
		Self::Accommodation,
		Self::ClothingAndAccessories,
		Self::EverythingElse,
		Self::FoodAndDrinkContainers,
		Self::FurnitureAndAppliances,
		Self::SportsAndFitness,
		Self::TechAndGadgets,
		Self::TextbooksAndStudyMaterials,
	];

	/// Storage key.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Accommodation => "accommodation",
			Self::ClothingAndAccessories => "clothing_and_accessories",
			Self::EverythingElse => "everything_else",
			Self::FoodAndDrinkContainers => "food_and_drink_containers",
			Self::FurnitureAndAppliances => "furniture_and_appliances",
			Self::SportsAndFitness => "sports_and_fitness",
			Self::TechAndGadgets => "tech_and_gadgets",
			Self::TextbooksAndStudyMaterials => "textbooks_and_study_materials",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Accommodation => "Accommodation",
			Self::ClothingAndAccessories => "Clothing and Accessories",
			Self::EverythingElse => "Everything Else",
			Self::FoodAndDrinkContainers => "Food and Drink Containers",
			Self::FurnitureAndAppliances => "Furniture and Appliances",
			Self::SportsAndFitness => "Sports and Fitness",
			Self::TechAndGadgets => "Tech and Gadgets",
			Self::TextbooksAndStudyMaterials => "Textbooks and Study Materials",
		}
	}

	/// Accepts either the storage key or the display label.
	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL
			.into_iter()
			.find(|category| {
				category.as_str() == raw || category.label().eq_ignore_ascii_case(raw)
			})
	}
}
impl TryFrom<String> for Category {
	type Error = ShapeError;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		Self::parse(&raw).ok_or_else(|| ShapeError::new(format!("Unknown category {raw:?}.")))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
	New,
	LikeNew,
	Used,
	HeavilyUsed,
}
impl Condition {
	pub const ALL: [Self; 4] = [Self::New, Self::LikeNew, Self::Used, Self::HeavilyUsed];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::New => "new",
			Self::LikeNew => "like_new",
			Self::Used => "used",
			Self::HeavilyUsed => "heavily_used",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::New => "New",
			Self::LikeNew => "Like New",
			Self::Used => "Used",
			Self::HeavilyUsed => "Heavily Used",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL
			.into_iter()
			.find(|condition| {
				condition.as_str() == raw || condition.label().eq_ignore_ascii_case(raw)
			})
	}
}
impl TryFrom<String> for Condition {
	type Error = ShapeError;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		Self::parse(&raw).ok_or_else(|| ShapeError::new(format!("Unknown condition {raw:?}.")))
	}
}

/// How well a candidate fits the stated preferences, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
	Strong,
	Partial,
	Weak,
	None,
}
impl MatchQuality {
	pub fn is_plausible(self) -> bool {
		!matches!(self, Self::None)
	}
}

/// The text-bearing fields of a listing. Only these feed the embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingText<'a> {
	pub title: &'a str,
	pub description: &'a str,
	pub brand: Option<&'a str>,
	pub category: Category,
}
impl ListingText<'_> {
	/// Concatenated searchable text. `None` when every text-bearing field is blank.
	pub fn searchable_text(&self) -> Option<String> {
		let title = self.title.trim();
		let description = self.description.trim();

		if title.is_empty() && description.is_empty() {
			return None;
		}

		let mut parts = Vec::with_capacity(4);

		if !title.is_empty() {
			parts.push(format!("Title: {title}"));
		}
		if !description.is_empty() {
			parts.push(format!("Description: {description}"));
		}

		if let Some(brand) = self.brand.map(str::trim).filter(|brand| !brand.is_empty()) {
			parts.push(format!("Brand: {brand}"));
		}

		parts.push(format!("Category: {}", self.category.label()));

		Some(parts.join("\n"))
	}

	/// Whether any text-bearing field differs. Whitespace-only edits count as no change.
	pub fn differs_from(&self, other: &ListingText<'_>) -> bool {
		self.title.trim() != other.title.trim()
			|| self.description.trim() != other.description.trim()
			|| self.brand.map(str::trim).unwrap_or_default()
				!= other.brand.map(str::trim).unwrap_or_default()
			|| self.category != other.category
	}
}

/// Renders integer cents as a dollar amount, e.g. `$12.50`.
pub fn format_price(cents: i64) -> String {
	let sign = if cents < 0 { "-" } else { "" };
	let abs = cents.unsigned_abs();

	format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
