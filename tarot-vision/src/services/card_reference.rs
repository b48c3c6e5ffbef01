//! Card Reference
//!
//! Static lookup of the 78 standard tarot cards with canonical (English) and
//! local (Chinese) names. Used to validate reviewer input and to fill in the
//! missing name of a manually entered card.
//!
//! # Matching
//! Names are compared after [`normalize_name`]. An exact match wins; failing
//! that, the first card (in deck order) whose name contains the query or is
//! contained in it is returned, so "wheel" resolves to Wheel of Fortune.

use once_cell::sync::Lazy;
use serde::Serialize;

use super::annotation_comparator::normalize_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arcana {
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Suit {
    Wands,
    Cups,
    Swords,
    Pentacles,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Wands, Suit::Cups, Suit::Swords, Suit::Pentacles];

    fn local_name(self) -> &'static str {
        match self {
            Suit::Wands => "权杖",
            Suit::Cups => "圣杯",
            Suit::Swords => "宝剑",
            Suit::Pentacles => "星币",
        }
    }
}

/// One card of the standard deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    /// Stable identifier, e.g. `major-00`, `cups-14`
    pub key: String,
    #[serde(rename = "enName")]
    pub name_canonical: String,
    #[serde(rename = "cnName")]
    pub name_local: String,
    pub arcana: Arcana,
    pub suit: Option<Suit>,
}

const MAJOR_ARCANA: [(&str, &str); 22] = [
    ("The Fool", "愚者"),
    ("The Magician", "魔术师"),
    ("The High Priestess", "女祭司"),
    ("The Empress", "女皇"),
    ("The Emperor", "皇帝"),
    ("The Hierophant", "教皇"),
    ("The Lovers", "恋人"),
    ("The Chariot", "战车"),
    ("Strength", "力量"),
    ("The Hermit", "隐士"),
    ("Wheel of Fortune", "命运之轮"),
    ("Justice", "正义"),
    ("The Hanged Man", "倒吊人"),
    ("Death", "死神"),
    ("Temperance", "节制"),
    ("The Devil", "恶魔"),
    ("The Tower", "高塔"),
    ("The Star", "星星"),
    ("The Moon", "月亮"),
    ("The Sun", "太阳"),
    ("Judgement", "审判"),
    ("The World", "世界"),
];

/// Ace..Ten then the court cards
const RANKS: [(&str, &str); 14] = [
    ("Ace", "一"),
    ("Two", "二"),
    ("Three", "三"),
    ("Four", "四"),
    ("Five", "五"),
    ("Six", "六"),
    ("Seven", "七"),
    ("Eight", "八"),
    ("Nine", "九"),
    ("Ten", "十"),
    ("Page", "侍从"),
    ("Knight", "骑士"),
    ("Queen", "王后"),
    ("King", "国王"),
];

static DECK: Lazy<Vec<CardInfo>> = Lazy::new(|| {
    let mut deck = Vec::with_capacity(78);

    for (i, (canonical, local)) in MAJOR_ARCANA.iter().enumerate() {
        deck.push(CardInfo {
            key: format!("major-{:02}", i),
            name_canonical: canonical.to_string(),
            name_local: local.to_string(),
            arcana: Arcana::Major,
            suit: None,
        });
    }

    for suit in Suit::ALL {
        for (i, (rank, rank_local)) in RANKS.iter().enumerate() {
            deck.push(CardInfo {
                key: format!("{}-{:02}", format!("{:?}", suit).to_lowercase(), i + 1),
                name_canonical: format!("{} of {:?}", rank, suit),
                name_local: format!("{}{}", suit.local_name(), rank_local),
                arcana: Arcana::Minor,
                suit: Some(suit),
            });
        }
    }

    deck
});

/// Every card, majors first, then Wands, Cups, Swords, Pentacles
pub fn all_cards() -> &'static [CardInfo] {
    &DECK
}

pub fn find_by_canonical(name: &str) -> Option<&'static CardInfo> {
    find_by(name, |card| &card.name_canonical)
}

pub fn find_by_local(name: &str) -> Option<&'static CardInfo> {
    find_by(name, |card| &card.name_local)
}

/// Look a name up in either language
pub fn find_card(name: &str) -> Option<&'static CardInfo> {
    find_by_canonical(name).or_else(|| find_by_local(name))
}

/// Whether a pair of names is acceptable for one card
///
/// Valid when at least one name is known and, if both are, they are the same
/// card.
pub fn is_valid_pair(name_canonical: &str, name_local: &str) -> bool {
    match (find_by_canonical(name_canonical), find_by_local(name_local)) {
        (None, None) => false,
        (Some(a), Some(b)) => a.key == b.key,
        _ => true,
    }
}

/// Cards whose names or key contain `query`; everything for a blank query
pub fn search(query: &str) -> Vec<&'static CardInfo> {
    let query = normalize_name(query);
    DECK.iter()
        .filter(|card| {
            query.is_empty()
                || normalize_name(&card.name_canonical).contains(&query)
                || card.name_local.contains(&query)
                || card.key.contains(&query)
        })
        .collect()
}

/// Search results, or the single card whose name `query` contains when the
/// search finds nothing ("the tower card")
pub fn lookup(query: &str) -> Vec<&'static CardInfo> {
    let found = search(query);
    if found.is_empty() {
        return find_card(query).into_iter().collect();
    }
    found
}

fn find_by(name: &str, field: impl Fn(&CardInfo) -> &String) -> Option<&'static CardInfo> {
    let query = normalize_name(name);
    if query.is_empty() {
        return None;
    }

    let exact = DECK.iter().find(|card| normalize_name(field(card)) == query);
    exact.or_else(|| {
        DECK.iter().find(|card| {
            let known = normalize_name(field(card));
            known.contains(&query) || query.contains(&known)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_shape() {
        let deck = all_cards();
        assert_eq!(deck.len(), 78);
        assert_eq!(deck.iter().filter(|c| c.arcana == Arcana::Major).count(), 22);
        assert_eq!(deck[22].name_canonical, "Ace of Wands");
        assert_eq!(deck[22].name_local, "权杖一");
        assert_eq!(deck[77].name_canonical, "King of Pentacles");
        assert_eq!(deck[77].key, "pentacles-14");
    }

    #[test]
    fn test_lookup_is_normalized() {
        assert_eq!(find_by_canonical("  the   FOOL ").unwrap().name_local, "愚者");
        assert_eq!(find_by_local("圣杯王后").unwrap().name_canonical, "Queen of Cups");
        assert_eq!(find_card("高塔").unwrap().name_canonical, "The Tower");
        assert!(find_card("").is_none());
        assert!(find_card("Not a card").is_none());
    }

    #[test]
    fn test_partial_names() {
        assert_eq!(find_by_canonical("star").unwrap().name_canonical, "The Star");
        assert_eq!(find_by_canonical("wheel").unwrap().name_local, "命运之轮");
        assert_eq!(find_by_canonical("The Sun").unwrap().name_local, "太阳");
    }

    #[test]
    fn test_valid_pair() {
        assert!(is_valid_pair("The Fool", "愚者"));
        assert!(is_valid_pair("The Fool", ""));
        assert!(!is_valid_pair("The Fool", "魔术师"));
        assert!(!is_valid_pair("", ""));
    }

    #[test]
    fn test_search() {
        assert_eq!(search("").len(), 78);
        assert_eq!(search("knight").len(), 4);
        assert_eq!(search("星币").len(), 14);
    }

    #[test]
    fn test_lookup_falls_back_to_name_in_query() {
        assert_eq!(lookup("knight").len(), 4);

        let found = lookup("the tower card");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "major-16");

        assert!(lookup("nothing like a card").is_empty());
    }
}
