//! 一覧のページ送り
//!
//! ページ送りは `img` の `onclick="location.href='...'"` で実装されているので、
//! 属性からURLを取り出して直接遷移する。

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::error::ScraperError;
use crate::frame::Frame;

static LOCATION_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"location\.href\s*=\s*'([^']+)'").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerDirection {
    First,
    Previous,
    Next,
    Last,
}

impl PagerDirection {
    /// 対応するページ送り画像のセレクタ
    pub fn selector(self) -> &'static str {
        match self {
            PagerDirection::First => r#"img[title="Primera página"][src*="primera_pagina.jpg"]"#,
            PagerDirection::Previous => {
                r#"img[title="Página anterior"][src*="pagina_anterior.jpg"]"#
            }
            PagerDirection::Next => r#"img[title="Página siguiente"][src*="pagina_siguiente.jpg"]"#,
            PagerDirection::Last => r#"img[title="Última página"][src*="ultima_pagina.jpg"]"#,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerMove {
    /// 遷移した
    Moved(Url),
    /// ボタンがない・遷移先が読めない
    Stay,
}

impl PagerMove {
    pub fn moved(&self) -> bool {
        matches!(self, PagerMove::Moved(_))
    }
}

/// ページ送りボタンが押せる状態か（遷移はしない）
pub async fn is_available<F: Frame + ?Sized>(
    frame: &F,
    direction: PagerDirection,
) -> Result<bool, ScraperError> {
    Ok(frame.count(direction.selector()).await? > 0)
}

/// 指定方向へページを送る
pub async fn goto_pager<F: Frame + ?Sized>(
    frame: &mut F,
    direction: PagerDirection,
) -> Result<PagerMove, ScraperError> {
    let selector = direction.selector();

    if frame.count(selector).await? == 0 {
        debug!("Pager control {:?} not present", direction);
        return Ok(PagerMove::Stay);
    }

    let Some(onclick) = frame.attribute(selector, "onclick").await? else {
        debug!("Pager control {:?} has no onclick", direction);
        return Ok(PagerMove::Stay);
    };

    let base = Url::parse(&frame.url().await?)?;
    let Some(target) = onclick_to_url(&onclick, &base) else {
        debug!("Unrecognized pager onclick: {}", onclick);
        return Ok(PagerMove::Stay);
    };

    debug!("Pager {:?} -> {}", direction, target);
    frame.goto(target.as_str()).await?;
    Ok(PagerMove::Moved(target))
}

pub async fn goto_next<F: Frame + ?Sized>(frame: &mut F) -> Result<PagerMove, ScraperError> {
    goto_pager(frame, PagerDirection::Next).await
}

/// `onclick` の `location.href='...'` を絶対URLに変換
///
/// 例: `javascript: location.href='proyectosDirigidos.jsp?...&amp;indice_pagina=2';`
pub fn onclick_to_url(onclick: &str, base: &Url) -> Option<Url> {
    let caps = LOCATION_HREF_RE.captures(onclick)?;
    let relative = caps[1].replace("&amp;", "&");
    base.join(&relative).ok()
}
