//! Platform Catalog
//!
//! 런칭 대상 플랫폼 목록 (국내/해외). 저장소에 두지 않는 설정 데이터입니다.

use serde::{Deserialize, Serialize};

use crate::error::{LaunchError, LaunchResult};
use crate::keys::CANONICAL_SEPARATOR;
use crate::models::{LaunchCategory, Region};

/// 국내 플랫폼 (id, 표시명)
pub const DOMESTIC_PLATFORMS: [(&str, &str); 24] = [
    ("naver_series", "네이버 시리즈"),
    ("kakao_page", "카카오페이지"),
    ("kakao_webtoon", "카카오웹툰"),
    ("ridi", "리디"),
    ("lezhin", "레진코믹스"),
    ("toptoon", "탑툰"),
    ("toomics", "투믹스"),
    ("bomtoon", "봄툰"),
    ("mrblue", "미스터블루"),
    ("comico", "코미코"),
    ("onestore", "원스토어"),
    ("kyobo", "교보문고"),
    ("yes24", "예스24"),
    ("aladin", "알라딘"),
    ("bookcube", "북큐브"),
    ("pickmetoon", "픽미툰"),
    ("ktoon", "케이툰"),
    ("bufftoon", "버프툰"),
    ("anytoon", "애니툰"),
    ("mootoon", "무툰"),
    ("bookpal", "북팔"),
    ("millie", "밀리의서재"),
    ("peanutoon", "피너툰"),
    ("watcha", "왓챠"),
];

/// 해외 플랫폼 (id, 표시명)
pub const OVERSEAS_PLATFORMS: [(&str, &str); 18] = [
    ("webtoon_global", "WEBTOON"),
    ("tapas", "Tapas"),
    ("tappytoon", "Tappytoon"),
    ("lezhin_us", "Lezhin US"),
    ("lezhin_jp", "Lezhin JP"),
    ("manta", "Manta"),
    ("pocket_comics", "Pocket Comics"),
    ("piccoma", "piccoma"),
    ("line-manga", "LINEマンガ"),
    ("mechacomic", "めちゃコミック"),
    ("cmoa", "コミックシーモア"),
    ("renta", "Renta!"),
    ("toomics_global", "Toomics Global"),
    ("globalcomix", "GlobalComix"),
    ("inkr", "INKR"),
    ("comikey", "Comikey"),
    ("bilibili", "哔哩哔哩漫画"),
    ("kuaikan", "快看漫画"),
];

/// 플랫폼 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    pub id: String,
    pub display_name: String,
}

impl Platform {
    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// 국내/해외 플랫폼 카탈로그
#[derive(Debug, Clone)]
pub struct PlatformCatalog {
    domestic: Vec<Platform>,
    overseas: Vec<Platform>,
}

impl Default for PlatformCatalog {
    fn default() -> Self {
        Self {
            domestic: DOMESTIC_PLATFORMS.iter().map(|(id, name)| Platform::new(id, name)).collect(),
            overseas: OVERSEAS_PLATFORMS.iter().map(|(id, name)| Platform::new(id, name)).collect(),
        }
    }
}

impl PlatformCatalog {
    pub fn platforms(&self, region: Region) -> &[Platform] {
        match region {
            Region::Domestic => &self.domestic,
            Region::Overseas => &self.overseas,
        }
    }

    /// 카테고리 필터에 해당하는 플랫폼 목록
    pub fn for_category(&self, category: &LaunchCategory) -> &[Platform] {
        self.platforms(category.region)
    }

    pub fn find(&self, platform_id: &str) -> Option<(Region, &Platform)> {
        [Region::Domestic, Region::Overseas].into_iter().find_map(|region| {
            self.platforms(region)
                .iter()
                .find(|p| p.id == platform_id)
                .map(|p| (region, p))
        })
    }

    /// 플랫폼 추가 (빈 값, 중복 ID, 키 구분자 포함 ID 거부)
    pub fn add_platform(&mut self, region: Region, id: &str, display_name: &str) -> LaunchResult<&Platform> {
        let id = id.trim();
        let display_name = display_name.trim();
        if id.is_empty() || display_name.is_empty() {
            return Err(LaunchError::validation("플랫폼 ID와 이름을 모두 입력해주세요."));
        }
        if id.contains(CANONICAL_SEPARATOR) {
            return Err(LaunchError::validation(format!(
                "플랫폼 ID에 '{}'를 사용할 수 없습니다: {}",
                CANONICAL_SEPARATOR, id
            )));
        }
        if self.find(id).is_some() {
            return Err(LaunchError::validation(format!("이미 등록된 플랫폼입니다: {}", id)));
        }

        let list = match region {
            Region::Domestic => &mut self.domestic,
            Region::Overseas => &mut self.overseas,
        };
        list.push(Platform::new(id, display_name));
        Ok(&list[list.len() - 1])
    }
}
