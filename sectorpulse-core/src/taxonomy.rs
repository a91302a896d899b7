//! Vendor sector taxonomies mapped onto the fixed [`Sector`] set.
//!
//! Each market's data vendor classifies instruments its own way (Yahoo and
//! Finnhub English industry names, KRX sector indices, Shenwan level-1
//! industries, vnstock industries). Adapters run the vendor string through
//! the market's taxonomy at the boundary so the pipeline only ever sees
//! [`Sector`] values. Anything unmapped becomes [`Sector::Other`].

use crate::domain::{Market, Sector};
use serde::{Deserialize, Serialize};

/// A vendor classification scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    /// Yahoo Finance / Finnhub English sector names, plus GICS spellings.
    Gics,
    /// Korea Exchange sector-index and industry names.
    Krx,
    /// Shenwan (SW) level-1 industries used by Chinese data vendors.
    Shenwan,
    /// vnstock English industry names.
    Vietnam,
}

impl Taxonomy {
    /// Taxonomy used by the default data source for a market.
    pub fn default_for(market: Market) -> Self {
        match market {
            Market::KR => Self::Krx,
            Market::CN => Self::Shenwan,
            Market::VN => Self::Vietnam,
            Market::US | Market::JP | Market::IN | Market::DE => Self::Gics,
        }
    }

    /// Map a vendor sector string. Unknown strings map to `Sector::Other`.
    pub fn map(&self, vendor_sector: &str) -> Sector {
        let key = vendor_sector.trim();
        let mapped = match self {
            Self::Gics => gics(key),
            Self::Krx => krx(key),
            Self::Shenwan => shenwan(key),
            Self::Vietnam => vietnam(key),
        };
        // Vendors occasionally hand back an already-normalized label.
        mapped
            .or_else(|| key.parse::<Sector>().ok())
            .unwrap_or(Sector::Other)
    }
}

fn gics(key: &str) -> Option<Sector> {
    use Sector::*;
    let sector = match key {
        "Technology" | "Information Technology" => InformationTechnology,
        "Financial Services" | "Financials" => Financials,
        "Healthcare" | "Health Care" => HealthCare,
        "Consumer Cyclical" | "Consumer Discretionary" => ConsumerDiscretionary,
        "Consumer Defensive" | "Consumer Staples" => ConsumerStaples,
        "Industrials" => Industrials,
        "Energy" => Energy,
        "Basic Materials" | "Materials" => Materials,
        "Utilities" => Utilities,
        "Real Estate" => RealEstate,
        "Communication Services" => CommunicationServices,
        _ => return None,
    };
    Some(sector)
}

fn krx(key: &str) -> Option<Sector> {
    use Sector::*;
    let sector = match key {
        // Sector indices
        "음식료·담배" => ConsumerStaples,
        "섬유·의류" => ConsumerDiscretionary,
        "종이·목재" | "화학" | "비금속" | "금속" => Materials,
        "제약" | "의료·정밀기기" => HealthCare,
        "기계·장비" | "운송장비·부품" | "건설" | "운송·창고" | "일반서비스" | "제조"
        | "기타제조" => Industrials,
        "전기전자" | "IT 서비스" => InformationTechnology,
        "유통" => ConsumerDiscretionary,
        "전기·가스" => Utilities,
        "통신" | "오락·문화" | "출판·매체복제" => CommunicationServices,
        "금융" | "증권" | "보험" => Financials,
        "부동산" => RealEstate,
        // Industry names
        "반도체" | "IT부품" | "IT가전" | "소프트웨어" | "컴퓨터서비스" | "통신장비"
        | "전자장비와기기" | "전자제품" | "디스플레이" => InformationTechnology,
        "은행" | "기타금융" | "카드" | "캐피탈" => Financials,
        "바이오" | "의료정밀" | "건강관리장비와용품" => HealthCare,
        "자동차" | "자동차부품" | "호텔,레스토랑,레저" | "미디어" | "섬유,의류,신발,호화품"
        | "교육서비스" | "내구소비재와의류" => ConsumerDiscretionary,
        "음식료" | "담배" | "생활용품" | "식품" | "식품과생활용품소매" => ConsumerStaples,
        "기계" | "조선" | "운수장비" | "운수창고" | "항공사" | "해운사" | "방위산업"
        | "우주항공과국방" | "전기장비" => Industrials,
        "에너지" | "석유와가스" => Energy,
        "철강" | "비철금속" | "종이와목재" | "광업" | "포장재" => Materials,
        "전기가스" | "유틸리티" => Utilities,
        "방송" | "게임" | "인터넷" => CommunicationServices,
        _ => return None,
    };
    Some(sector)
}

fn shenwan(key: &str) -> Option<Sector> {
    use Sector::*;
    let sector = match key {
        "银行" | "非银金融" => Financials,
        "房地产" => RealEstate,
        "医药生物" => HealthCare,
        "电子" | "计算机" => InformationTechnology,
        "通信" | "传媒" => CommunicationServices,
        "食品饮料" | "农林牧渔" => ConsumerStaples,
        "家用电器" | "汽车" | "商贸零售" | "纺织服装" | "美容护理" => ConsumerDiscretionary,
        "轻工制造" | "机械设备" | "电力设备" | "建筑装饰" | "国防军工" | "交通运输"
        | "社会服务" | "环保" | "综合" => Industrials,
        "建筑材料" | "化工" | "钢铁" | "有色金属" => Materials,
        "采掘" | "石油石化" | "煤炭" => Energy,
        "公用事业" | "电力" => Utilities,
        _ => return None,
    };
    Some(sector)
}

fn vietnam(key: &str) -> Option<Sector> {
    use Sector::*;
    let sector = match key {
        "Banks" | "Financial Services" | "Insurance" | "Securities" => Financials,
        "Real Estate" => RealEstate,
        "Construction" | "Transportation" | "Logistics" | "Industrial" => Industrials,
        "Building Materials" | "Steel" | "Chemicals" | "Mining" | "Rubber" | "Plastics" => {
            Materials
        }
        "Technology" | "Information Technology" | "Software" => InformationTechnology,
        "Telecommunications" | "Media" => CommunicationServices,
        "Healthcare" | "Pharmaceuticals" => HealthCare,
        "Food & Beverage" | "Consumer Staples" | "Consumer Goods" | "Agriculture"
        | "Aquaculture" => ConsumerStaples,
        "Retail" | "Consumer Discretionary" | "Automobiles" | "Textiles" => {
            ConsumerDiscretionary
        }
        "Oil & Gas" | "Energy" => Energy,
        "Electricity" | "Utilities" | "Water" => Utilities,
        _ => return None,
    };
    Some(sector)
}
