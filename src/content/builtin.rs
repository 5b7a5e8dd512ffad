//! Built-in default dataset.
//!
//! Fallback content compiled into the binary so the server runs without an
//! external content file. Same shape the import pipeline emits.

use super::{ContentSet, FillerPost, SignalPost, Theme};

fn post(text: &str, author: &str, handle: &str, age: &str) -> SignalPost {
    SignalPost {
        text: text.into(),
        author: author.into(),
        handle: handle.into(),
        age: age.into(),
    }
}

fn filler(text: &str, author: &str, handle: &str, age: &str) -> FillerPost {
    FillerPost {
        text: text.into(),
        author: author.into(),
        handle: handle.into(),
        age: age.into(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).into()).collect()
}

/// Build the default content set.
pub(super) fn content_set() -> ContentSet {
    ContentSet {
        themes: vec![
            Theme {
                keyword: "dog".into(),
                marker: "🐕".into(),
                names: strings(&["Dogwif Coin", "WIF"]),
                decoys: strings(&[
                    "DOGE2", "Shibarium", "PUPPY", "Wifhat", "BORKED", "Doggo Token",
                    "MUTT", "Golden Boy", "BARK", "Leashless",
                ]),
                decoy_markers: strings(&["🦴", "🐶", "🐩", "🐺", "🐾", "🌭", "🎾"]),
                posts: vec![
                    post("dog szn is back. one ticker only.", "Trench Oracle", "@trench_oracle", "1m"),
                    post("WIF flow just woke up, dont fade this", "Alpha Hound", "@alpha_hound", "2m"),
                    post("the dogs are running again", "Degen Dispatch", "@degen_dispatch", "30s"),
                ],
            },
            Theme {
                keyword: "cat".into(),
                marker: "🐈".into(),
                names: strings(&["Popcat Coin", "POPCAT"]),
                decoys: strings(&[
                    "MEOW", "Catwifhat", "Whiskers", "NYAN2", "Feline Finance", "PURR",
                    "Tomcat", "Alleycat", "Kitten Szn",
                ]),
                decoy_markers: strings(&["🐱", "🐯", "🦁", "😼", "🐾", "🧶"]),
                posts: vec![
                    post("cat meta loading. POPCAT chart looks ready", "Trench Oracle", "@trench_oracle", "45s"),
                    post("im hearing cat rotation from the group chats", "Whale Watcher", "@whale_watch", "3m"),
                ],
            },
            Theme {
                keyword: "frog".into(),
                marker: "🐸".into(),
                names: strings(&["Pepe Classic", "PEPEC"]),
                decoys: strings(&[
                    "RIBBIT", "Frogwifhat", "Toadster", "Lilypad", "Swamp King", "KEK Coin",
                    "Pond Life", "Hopper",
                ]),
                decoy_markers: strings(&["🪷", "🦎", "🐊", "💚", "🌿"]),
                posts: vec![
                    post("frogs never die. PEPEC revival arc", "Degen Dispatch", "@degen_dispatch", "1m"),
                    post("green candle szn, you know which pond", "Alpha Hound", "@alpha_hound", "4m"),
                ],
            },
            Theme {
                keyword: "moon".into(),
                marker: "🌙".into(),
                names: strings(&["Moonshot Token", "MOON"]),
                decoys: strings(&[
                    "Lunar Coin", "Apollo", "CRATER", "Eclipse", "Tide Token", "Orbit Finance",
                    "Waxing", "Selene",
                ]),
                decoy_markers: strings(&["🌕", "🌑", "🚀", "🛰️", "⭐", "🌌"]),
                posts: vec![
                    post("MOON devs just shipped. this is the one", "Trench Oracle", "@trench_oracle", "2m"),
                    post("lunar narrative heating up fast", "Whale Watcher", "@whale_watch", "50s"),
                ],
            },
            Theme {
                keyword: "chef".into(),
                marker: "👨‍🍳".into(),
                names: strings(&["Cookin Coin", "COOK"]),
                decoys: strings(&[
                    "Michelin", "SAUCE", "Line Cook", "Burnt Toast", "Umami", "Gordon Token",
                    "Sizzle", "PREP",
                ]),
                decoy_markers: strings(&["🍳", "🔪", "🥘", "🧑‍🍳", "🍔", "🔥"]),
                posts: vec![
                    post("dev is literally cookin. COOK board filling", "Degen Dispatch", "@degen_dispatch", "1m"),
                    post("kitchen is open, apes know the ticker", "Alpha Hound", "@alpha_hound", "3m"),
                ],
            },
            Theme {
                keyword: "ghost".into(),
                marker: "👻".into(),
                names: strings(&["Phantom Pump", "BOO"]),
                decoys: strings(&[
                    "Spectre", "Haunt Coin", "WRAITH", "Poltergeist", "Seance", "Ecto Token",
                    "Graveyard", "SPOOK",
                ]),
                decoy_markers: strings(&["🎃", "🕸️", "💀", "🦇", "🌫️"]),
                posts: vec![
                    post("BOO stealth launch, chart is haunted", "Whale Watcher", "@whale_watch", "40s"),
                    post("ghost chain szn. dont blink", "Trench Oracle", "@trench_oracle", "2m"),
                ],
            },
        ],
        fillers: vec![
            filler("gm to everyone except jeeters", "Cope Lord", "@cope_lord", "5m"),
            filler("who else got rugged this morning lol", "Exit Liquidity", "@exit_liq", "8m"),
            filler("chart looks bullish if you rotate your phone", "TA Wizard", "@ta_wizard", "12m"),
            filler("my bags are heavy and so is my heart", "Bag Holder", "@bag_holder", "3m"),
            filler("new ATH in gas fees, congrats everyone", "Gas Griefer", "@gas_grief", "7m"),
            filler("unfollowing everyone who sold the bottom", "Diamond Dan", "@diamond_dan", "15m"),
            filler("wen lambo? asking for a friend", "Lambo Larry", "@lambo_larry", "20m"),
            filler("just aped my rent money. again.", "Rent Free", "@rent_free", "2m"),
        ],
        noise_tickers: strings(&[
            "GM", "WAGMI", "NGMI", "COPE", "FOMO", "HODL", "APED", "RUGME", "SERS",
            "PONZU", "GIGA", "SMOL", "CHAD", "DUMP", "PAMP", "JEET", "BASED", "MOONBOI",
        ]),
        noise_markers: strings(&[
            "🎲", "🧊", "🥵", "📈", "📉", "🧻", "💎", "🙌", "🤡", "🫡", "🦍", "🐳",
        ]),
    }
}
