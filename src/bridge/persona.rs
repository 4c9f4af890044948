//! Disguised author personas.
//!
//! A persona is a pure function of its seed: the SHA-256 digest of the seed
//! seeds a `StdRng`, which picks one adjective and then one noun. The avatar is
//! a DiceBear URL keyed by the seed and both words; it is only built, never
//! fetched.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::bridge::store::{Document, DocumentTable};
use crate::common::error::{PersonaError, StoreError};

const DICEBEAR_BASE_URL: &str = "https://api.dicebear.com/9.x/bottts-neutral/png";

/// Key of the word-list document in the persona table.
pub const DICTIONARY_ID: &str = "dictionary";

const FALLBACK_SEED: &str = "fallback";
const FALLBACK_NAME: &str = "Virtual Herald";

/// Display identity used when posting a mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub seed: String,
    pub display_name: String,
    pub avatar_url: String,
}

/// Word lists personas are composed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordLists {
    pub adjectives: Vec<String>,
    pub nouns: Vec<String>,
}

impl WordLists {
    pub fn new<A, N>(adjectives: A, nouns: N) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            adjectives: adjectives.into_iter().map(Into::into).collect(),
            nouns: nouns.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for WordLists {
    fn default() -> Self {
        Self::new(DEFAULT_ADJECTIVES.iter().copied(), DEFAULT_NOUNS.iter().copied())
    }
}

/// Persisted form of the word lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDictionary {
    pub id: String,
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub nouns: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Document for PersonaDictionary {
    fn key(&self) -> String {
        self.id.clone()
    }
}

/// Deterministic persona generator.
#[derive(Debug, Clone)]
pub struct PersonaGenerator {
    words: WordLists,
}

impl PersonaGenerator {
    pub fn new(words: WordLists) -> Self {
        Self { words }
    }

    /// Read the word lists from the persona table, seeding it with the built-in
    /// lists when the dictionary document is missing.
    pub fn load_or_seed(table: &mut DocumentTable<PersonaDictionary>) -> Result<Self, StoreError> {
        if let Some(dictionary) = table.get(DICTIONARY_ID) {
            return Ok(Self::new(WordLists {
                adjectives: dictionary.adjectives.clone(),
                nouns: dictionary.nouns.clone(),
            }));
        }

        let words = WordLists::default();
        table.upsert(PersonaDictionary {
            id: DICTIONARY_ID.to_string(),
            adjectives: words.adjectives.clone(),
            nouns: words.nouns.clone(),
            updated_at: Utc::now(),
        })?;
        info!(
            adjectives = words.adjectives.len(),
            nouns = words.nouns.len(),
            "Persona dictionary seeded with default words"
        );

        Ok(Self::new(words))
    }

    /// Derive the persona for a seed.
    pub fn generate(&self, seed: &str) -> Result<Persona, PersonaError> {
        let mut rng_seed = [0u8; 32];
        rng_seed.copy_from_slice(&Sha256::digest(seed.as_bytes()));
        let mut rng = StdRng::from_seed(rng_seed);

        let adjective = self
            .words
            .adjectives
            .choose(&mut rng)
            .ok_or(PersonaError::EmptyDictionary { list: "adjectives" })?;
        let noun = self
            .words
            .nouns
            .choose(&mut rng)
            .ok_or(PersonaError::EmptyDictionary { list: "nouns" })?;

        let avatar_seed = format!("{}-{}-{}", seed, adjective, noun);
        Ok(Persona {
            seed: seed.to_string(),
            display_name: format!("{}{}", adjective, noun),
            avatar_url: format!(
                "{}?seed={}",
                DICEBEAR_BASE_URL,
                urlencoding::encode(&avatar_seed)
            ),
        })
    }

    /// The fixed persona used when generation fails.
    pub fn fallback(bot_avatar_url: &str) -> Persona {
        Persona {
            seed: FALLBACK_SEED.to_string(),
            display_name: FALLBACK_NAME.to_string(),
            avatar_url: bot_avatar_url.to_string(),
        }
    }
}

const DEFAULT_ADJECTIVES: &[&str] = &[
    "かわいい", "かっこいい", "おもしろい", "たのしい", "やさしい", "つよい", "よわい", "はやい",
    "おそい", "すばやい", "おおきい", "ちいさい", "ながい", "みじかい", "ひろい", "せまい",
    "あつい", "さむい", "あたたかい", "すずしい", "あかい", "あおい", "しろい", "くろい",
    "きいろい", "ちゃいろい", "あおじろい", "あかるい", "くらい", "あまい", "からい", "にがい",
    "すっぱい", "しょっぱい", "やわらかい", "かたい", "みずみずしい", "うるさい", "しぶい", "するどい",
    "にぶい", "たのもしい", "こころづよい", "あたらしい", "ふるい", "なつかしい", "めずらしい", "すごい",
    "まるい", "しかくい", "こい", "うすい", "かるい", "おもい", "けだかい", "きびしい",
    "おとなしい", "すばらしい", "たくましい", "うれしい", "あざやかな", "はなやかな", "しずかな", "にぎやかな",
    "おだやかな", "さわやかな", "つやつやな", "さらさらな", "なめらかな", "ふわふわな", "もふもふな", "ぴかぴかな",
    "きらきらな", "じょうぶな", "がんじょうな", "しなやかな", "優雅な", "上品な", "豪華な", "素朴な",
    "無邪気な", "純粋な", "可憐な", "温厚な", "ほがらかな", "気さくな", "まじめな", "正直な",
    "大胆な", "繊細な", "快適な", "健やかな", "清潔な", "清らかな", "陽気な", "快活な",
    "活発な", "器用な", "不器用な", "几帳面な", "粋な", "上質な", "高級な", "シンプルな",
    "クールな", "スマートな", "エレガントな", "キュートな", "ワイルドな", "ミステリアスな", "レトロな", "モダンな",
    "ポップな", "カラフルな", "カジュアルな", "フレッシュな", "フレンドリーな", "ハッピーな", "にこやかな", "清楚な",
];

const DEFAULT_NOUNS: &[&str] = &[
    "ねこ", "いぬ", "うさぎ", "くま", "ことり", "とり", "きつね", "たぬき",
    "りす", "ねずみ", "ぞう", "きりん", "ぱんだ", "らいおん", "とら", "おおかみ",
    "くじら", "いるか", "さめ", "ぺんぎん", "かめ", "かえる", "へび", "あり",
    "はち", "ちょう", "ほたる", "かに", "えび", "いか", "たこ", "くらげ",
    "ひつじ", "やぎ", "うし", "ぶた", "うま", "にわとり", "ひよこ", "すずめ",
    "ふくろう", "はと", "つばめ", "かもめ", "かも", "おたまじゃくし", "かぶとむし", "くわがた",
    "てんとうむし", "花", "木", "森", "林", "草", "葉っぱ", "つぼみ",
    "実", "種", "根っこ", "空", "雲", "雨", "雪", "風",
    "星", "月", "太陽", "海", "川", "湖", "島", "山",
    "谷", "砂", "石", "岩", "砂利", "土", "氷", "光",
    "影", "音", "声", "音色", "メロディ", "リズム", "ことば", "えがお",
    "なみだ", "ゆめ", "きぼう", "こころ", "いのち", "せかい", "ぼうけん", "ひみつ",
    "まほう", "でんせつ", "おとぎ話", "えほん", "ものがたり", "うた", "しあわせ", "ゆうき",
    "ちから", "きずな", "まなざし", "ほほえみ", "ごはん", "パン", "ケーキ", "クッキー",
    "ドーナツ", "アイス", "チョコ", "キャンディ", "りんご", "みかん", "いちご", "ぶどう",
    "もも", "さくらんぼ", "すいか", "バナナ", "なし", "かき", "メロン", "かぼちゃ",
    "じゃがいも", "にんじん", "たまねぎ", "トマト", "きゅうり", "なす", "ピーマン", "きのこ",
    "おにぎり", "うどん", "そば", "ラーメン", "カレー", "ハンバーグ", "ピザ", "サンドイッチ",
    "スープ", "サラダ", "おちゃ", "こうちゃ", "コーヒー", "ジュース", "ミルク", "ソーダ",
    "みず", "はちみつ", "バター", "チーズ", "いえ", "まち", "みち", "ばしょ",
    "お店", "公園", "学校", "図書館", "駅", "空港", "たび", "ふね",
    "くるま", "でんしゃ", "バス", "じてんしゃ", "ひこうき", "ロケット", "エレベーター", "はし",
    "みなと", "さかみち", "まど", "ドア", "かぎ", "つくえ", "いす", "ベッド",
    "ほん", "ノート", "えんぴつ", "ペン", "けしごむ", "カバン", "ふでばこ", "かさ",
    "ふく", "ぼうし", "くつ", "てぶくろ", "マフラー", "メガネ", "時計", "カメラ",
];
