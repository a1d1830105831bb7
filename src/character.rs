//! Character sheets for both rule systems
//!
//! Sheets are looked up by id through the engine's `CharacterProvider`
//! seam; the engine itself never creates or persists them.

use serde::{Deserialize, Serialize};

use crate::rules::check::{ability_modifier, Proficiency};

/// Damage types across both rulesets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Bludgeoning,
    Piercing,
    Slashing,
    Fire,
    Cold,
    Electricity,
    Acid,
    Sonic,
    Force,
    Mental,
    Poison,
    // GURPS-like physical types
    Crushing,
    Cutting,
    Impaling,
}

impl std::fmt::Display for DamageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Piercing => "piercing",
            DamageType::Slashing => "slashing",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Electricity => "electricity",
            DamageType::Acid => "acid",
            DamageType::Sonic => "sonic",
            DamageType::Force => "force",
            DamageType::Mental => "mental",
            DamageType::Poison => "poison",
            DamageType::Crushing => "crushing",
            DamageType::Cutting => "cutting",
            DamageType::Impaling => "impaling",
        };
        write!(f, "{}", s)
    }
}

/// PF2-like six-ability block
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Abilities {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Default for Abilities {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

/// Named ability, for skill definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Abilities {
    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.score(ability))
    }
}

/// Weapon traits that change resolution math
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponTrait {
    Agile,
    Finesse,
    Reach,
    Thrown,
    Unarmed,
    TwoHand,
}

/// A weapon entry on a PF2-like sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub id: String,
    pub name: String,
    /// Damage notation, e.g. "1d6"
    pub damage: String,
    pub damage_type: DamageType,
    #[serde(default)]
    pub traits: Vec<WeaponTrait>,
    /// Range increment in squares for ranged weapons
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<u32>,
    #[serde(default)]
    pub proficiency: Option<Proficiency>,
}

impl Weapon {
    pub fn has_trait(&self, t: WeaponTrait) -> bool {
        self.traits.contains(&t)
    }

    pub fn is_agile(&self) -> bool {
        self.has_trait(WeaponTrait::Agile)
    }

    pub fn is_ranged(&self) -> bool {
        self.range.is_some()
    }

    /// Unarmed fallback when a sheet has no weapons.
    pub fn fist() -> Self {
        Self {
            id: "fist".to_string(),
            name: "Fist".to_string(),
            damage: "1d4".to_string(),
            damage_type: DamageType::Bludgeoning,
            traits: vec![WeaponTrait::Agile, WeaponTrait::Finesse, WeaponTrait::Unarmed],
            range: None,
            proficiency: None,
        }
    }
}

/// Skill entry on a PF2-like sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pf2Skill {
    pub name: String,
    pub ability: Ability,
    pub proficiency: Proficiency,
}

/// Spellcasting tradition; decides the casting ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tradition {
    Arcane,
    Divine,
    Occult,
    Primal,
}

impl Tradition {
    pub fn casting_ability(self) -> Ability {
        match self {
            Tradition::Arcane => Ability::Intelligence,
            Tradition::Divine => Ability::Wisdom,
            Tradition::Occult => Ability::Charisma,
            Tradition::Primal => Ability::Wisdom,
        }
    }
}

/// Slots available at one spell level
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub level: u8,
    pub total: u8,
}

/// Focus point pool definition
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FocusPool {
    pub max: u8,
}

/// One casting tradition on a character. A character may carry several;
/// slot consumption is tracked per caster index on the combatant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellCaster {
    pub name: String,
    pub tradition: Tradition,
    pub proficiency: Proficiency,
    pub slots: Vec<SlotDefinition>,
    #[serde(default)]
    pub focus_pool: FocusPool,
    /// Spell names known per level; names index into the spell catalog
    #[serde(default)]
    pub known_spells: Vec<String>,
}

impl SpellCaster {
    pub fn slot_total(&self, level: u8) -> u8 {
        self.slots
            .iter()
            .find(|s| s.level == level)
            .map(|s| s.total)
            .unwrap_or(0)
    }
}

/// Shield carried by a PF2-like character
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Shield {
    pub ac_bonus: i32,
    pub hardness: i32,
    pub hit_points: i32,
}

/// PF2-like derived statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pf2Derived {
    pub hit_points: i32,
    pub armor_class: i32,
    pub fortitude_save: i32,
    pub reflex_save: i32,
    pub will_save: i32,
    pub perception: i32,
    /// Speed in feet; 5 feet per square
    pub speed: i32,
}

/// Save categories for spell/effect resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveKind {
    Fortitude,
    Reflex,
    Will,
}

impl Pf2Derived {
    pub fn save(&self, kind: SaveKind) -> i32 {
        match kind {
            SaveKind::Fortitude => self.fortitude_save,
            SaveKind::Reflex => self.reflex_save,
            SaveKind::Will => self.will_save,
        }
    }
}

/// PF2-like character sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pf2Sheet {
    pub id: String,
    pub name: String,
    pub level: i32,
    pub abilities: Abilities,
    pub derived: Pf2Derived,
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub skills: Vec<Pf2Skill>,
    /// Capability names from the feat table (content::feats)
    #[serde(default)]
    pub feats: Vec<String>,
    #[serde(default)]
    pub spellcasters: Vec<SpellCaster>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shield: Option<Shield>,
}

impl Pf2Sheet {
    pub fn has_feat(&self, name: &str) -> bool {
        self.feats.iter().any(|f| f == name)
    }

    /// Weapon by id, falling back to the first listed weapon, then Fist.
    pub fn weapon_or_default(&self, weapon_id: Option<&str>) -> Weapon {
        weapon_id
            .and_then(|id| self.weapons.iter().find(|w| w.id == id))
            .or_else(|| self.weapons.first())
            .cloned()
            .unwrap_or_else(Weapon::fist)
    }

    pub fn skill_bonus(&self, name: &str) -> i32 {
        self.skills
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| self.abilities.modifier(s.ability) + s.proficiency.bonus(self.level))
            .unwrap_or(0)
    }

    pub fn speed_in_squares(&self) -> i32 {
        self.derived.speed / 5
    }
}

/// GURPS-like four-attribute block
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: i32,
    pub dexterity: i32,
    pub intelligence: i32,
    pub health: i32,
}

/// GURPS-like derived statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GurpsDerived {
    pub hit_points: i32,
    pub fatigue_points: i32,
    pub basic_speed: f64,
    pub basic_move: i32,
    pub dodge: i32,
}

/// Derive GURPS-like stats from attributes.
pub fn gurps_derived(attributes: &Attributes) -> GurpsDerived {
    let basic_speed = (attributes.dexterity + attributes.health) as f64 / 4.0;
    let basic_move = basic_speed.floor() as i32;
    GurpsDerived {
        hit_points: attributes.strength,
        fatigue_points: attributes.health,
        basic_speed,
        basic_move,
        dodge: basic_move + 3,
    }
}

/// Skill entry on a GURPS-like sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GurpsSkill {
    pub name: String,
    pub level: i32,
}

/// Equipment entry on a GURPS-like sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub name: String,
    /// Damage notation when the item is a weapon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_type: Option<DamageType>,
    /// Range in hexes for ranged weapons
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<u32>,
}

/// GURPS-like character sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GurpsSheet {
    pub id: String,
    pub name: String,
    pub attributes: Attributes,
    pub derived: GurpsDerived,
    #[serde(default)]
    pub skills: Vec<GurpsSkill>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    /// Flat damage resistance subtracted from incoming damage
    #[serde(default)]
    pub damage_resistance: i32,
}

impl GurpsSheet {
    /// Best weapon-skill target, defaulting to DX.
    pub fn weapon_skill(&self) -> i32 {
        self.skills
            .first()
            .map(|s| s.level)
            .unwrap_or(self.attributes.dexterity)
    }

    pub fn first_weapon(&self) -> Option<&Equipment> {
        self.equipment.iter().find(|e| e.damage.is_some())
    }
}

/// Ruleset-tagged character sheet union
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "ruleset", rename_all = "snake_case")]
pub enum CharacterSheet {
    Pf2(Pf2Sheet),
    Gurps(GurpsSheet),
}

impl CharacterSheet {
    pub fn id(&self) -> &str {
        match self {
            CharacterSheet::Pf2(sheet) => &sheet.id,
            CharacterSheet::Gurps(sheet) => &sheet.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CharacterSheet::Pf2(sheet) => &sheet.name,
            CharacterSheet::Gurps(sheet) => &sheet.name,
        }
    }

    pub fn max_hp(&self) -> i32 {
        match self {
            CharacterSheet::Pf2(sheet) => sheet.derived.hit_points,
            CharacterSheet::Gurps(sheet) => sheet.derived.hit_points,
        }
    }

    pub fn as_pf2(&self) -> Option<&Pf2Sheet> {
        match self {
            CharacterSheet::Pf2(sheet) => Some(sheet),
            CharacterSheet::Gurps(_) => None,
        }
    }

    pub fn as_gurps(&self) -> Option<&GurpsSheet> {
        match self {
            CharacterSheet::Gurps(sheet) => Some(sheet),
            CharacterSheet::Pf2(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gurps_derived_stats() {
        let attributes = Attributes {
            strength: 12,
            dexterity: 12,
            intelligence: 10,
            health: 11,
        };
        let derived = gurps_derived(&attributes);
        assert_eq!(derived.hit_points, 12);
        assert_eq!(derived.fatigue_points, 11);
        assert_eq!(derived.basic_speed, 5.75);
        assert_eq!(derived.basic_move, 5);
        assert_eq!(derived.dodge, 8);
    }

    #[test]
    fn test_weapon_fallbacks() {
        let sheet = Pf2Sheet {
            id: "c1".into(),
            name: "Test".into(),
            level: 1,
            abilities: Abilities::default(),
            derived: Pf2Derived {
                hit_points: 18,
                armor_class: 15,
                fortitude_save: 5,
                reflex_save: 5,
                will_save: 5,
                perception: 5,
                speed: 25,
            },
            weapons: vec![],
            skills: vec![],
            feats: vec![],
            spellcasters: vec![],
            shield: None,
        };
        let weapon = sheet.weapon_or_default(None);
        assert_eq!(weapon.name, "Fist");
        assert!(weapon.is_agile());
    }

    #[test]
    fn test_tradition_casting_ability() {
        assert_eq!(Tradition::Arcane.casting_ability(), Ability::Intelligence);
        assert_eq!(Tradition::Divine.casting_ability(), Ability::Wisdom);
        assert_eq!(Tradition::Occult.casting_ability(), Ability::Charisma);
    }
}
