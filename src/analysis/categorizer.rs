use std::collections::HashMap;

use serde::Serialize;

use crate::{
    daemon::storage::entities::{Category, CategoryMinutes},
    utils::time::round_one_decimal,
};

/// Order in which keyword lists are tested. A title that mentions both a game and a browser
/// counts as a game.
pub const PRIORITY_ORDER: [Category; 5] = [
    Category::Game,
    Category::Work,
    Category::Entertainment,
    Category::Social,
    Category::Browse,
];

const WORK_KEYWORDS: &[&str] = &[
    "code", "vscode", "visual studio", "pycharm", "idea", "webstorm", "sublime", "notepad++",
    "vim", "nvim", "atom", "word", "excel", "powerpoint", "wps", "outlook", "terminal", "cmd",
    "powershell", "windowsterminal", "postman", "insomnia", "datagrip", "navicat", "dbeaver",
    "figma", "sketch", "photoshop", "illustrator", "notion", "obsidian", "typora", "markdown",
    "git", "github desktop", "sourcetree", "slack", "teams", "zoom", "腾讯会议", "钉钉",
];

const GAME_KEYWORDS: &[&str] = &[
    "steam", "epic games", "origin", "uplay", "battle.net", "league of legends", "lol",
    "英雄联盟", "genshin", "原神", "崩坏", "honkai", "minecraft", "我的世界", "csgo",
    "cs2", "counter-strike", "valorant", "无畏契约", "apex", "pubg", "绝地求生",
    "王者荣耀", "和平精英",
    "dota", "overwatch", "守望先锋", "elden ring", "艾尔登法环", "game", "游戏",
];

const ENTERTAINMENT_KEYWORDS: &[&str] = &[
    "bilibili", "哔哩哔哩", "b站", "youtube", "netflix", "爱奇艺", "iqiyi", "优酷",
    "youku", "腾讯视频", "抖音", "tiktok", "快手", "spotify", "网易云", "cloudmusic",
    "qq音乐", "酷狗",
    "酷我", "potplayer", "vlc", "mpv", "kmplayer", "twitch", "虎牙", "斗鱼", "直播",
];

// Single letter names like "x" would match nearly every executable, so X is matched by domain.
const SOCIAL_KEYWORDS: &[&str] = &[
    "微信", "wechat", "weixin", "qq", "discord", "telegram", "signal", "twitter", "x.com",
    "微博", "weibo", "instagram", "facebook", "小红书", "知乎", "zhihu",
];

const BROWSE_KEYWORDS: &[&str] = &[
    "chrome", "firefox", "edge", "safari", "opera", "brave", "浏览器", "browser",
];

fn default_keywords(category: Category) -> &'static [&'static str] {
    match category {
        Category::Work => WORK_KEYWORDS,
        Category::Game => GAME_KEYWORDS,
        Category::Entertainment => ENTERTAINMENT_KEYWORDS,
        Category::Social => SOCIAL_KEYWORDS,
        Category::Browse => BROWSE_KEYWORDS,
        Category::Other => &[],
    }
}

/// Maps a window to a [Category] through ordered keyword matching.
#[derive(Debug, Clone)]
pub struct Categorizer {
    /// Keywords are kept lower-cased.
    rules: HashMap<Category, Vec<String>>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Categorizer {
    pub fn new() -> Self {
        let rules = PRIORITY_ORDER
            .iter()
            .map(|category| {
                let keywords = default_keywords(*category)
                    .iter()
                    .map(|v| v.to_lowercase())
                    .collect();
                (*category, keywords)
            })
            .collect();
        Self { rules }
    }

    /// Default rules with `additions` appended after the built-in keywords of each category.
    pub fn with_additions(additions: &HashMap<Category, Vec<String>>) -> Self {
        let mut categorizer = Self::new();
        for (category, keywords) in additions {
            for keyword in keywords {
                categorizer.add_keyword(*category, keyword);
            }
        }
        categorizer
    }

    /// Adds a keyword unless the category already has it (ignoring case).
    pub fn add_keyword(&mut self, category: Category, keyword: &str) {
        let keyword = keyword.to_lowercase();
        let keywords = self.rules.entry(category).or_default();
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }

    pub fn keywords(&self, category: Category) -> &[String] {
        self.rules.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn categorize(&self, process_name: &str, window_title: &str) -> Category {
        let combined = format!(
            "{} {}",
            process_name.to_lowercase(),
            window_title.to_lowercase()
        );

        PRIORITY_ORDER
            .into_iter()
            .find(|category| {
                self.keywords(*category)
                    .iter()
                    .any(|keyword| !keyword.is_empty() && combined.contains(keyword.as_str()))
            })
            .unwrap_or(Category::Other)
    }
}

/// Ratios describing how a day was spent. All values are percentages with one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductivityAnalysis {
    pub productivity_ratio: f64,
    pub leisure_ratio: f64,
    pub work_focus_score: f64,
    pub balance_score: f64,
}

impl ProductivityAnalysis {
    /// Result for a day without any minutes. Balance is neutral rather than perfect.
    pub const EMPTY: ProductivityAnalysis = ProductivityAnalysis {
        productivity_ratio: 0.,
        leisure_ratio: 0.,
        work_focus_score: 0.,
        balance_score: 50.,
    };
}

const IDEAL_WORK_RATIO: f64 = 60.;
const IDEAL_LEISURE_RATIO: f64 = 30.;

pub fn analyze_productivity(minutes: &CategoryMinutes) -> ProductivityAnalysis {
    let total = minutes.total();
    if total == 0 {
        return ProductivityAnalysis::EMPTY;
    }
    let total = total as f64;

    let productivity_ratio = minutes.work as f64 / total * 100.;
    let leisure_ratio = (minutes.game + minutes.entertainment) as f64 / total * 100.;

    let work_related = minutes.work + minutes.social + minutes.browse;
    let work_focus_score = if work_related > 0 {
        minutes.work as f64 / work_related as f64 * 100.
    } else {
        0.
    };

    let balance_score = (100.
        - (productivity_ratio - IDEAL_WORK_RATIO).abs()
        - (leisure_ratio - IDEAL_LEISURE_RATIO).abs())
    .max(0.);

    ProductivityAnalysis {
        productivity_ratio: round_one_decimal(productivity_ratio),
        leisure_ratio: round_one_decimal(leisure_ratio),
        work_focus_score: round_one_decimal(work_focus_score),
        balance_score: round_one_decimal(balance_score),
    }
}
