use crate::models::{
    ConfirmedMatchRow, InvoiceRow, MatchCandidate, MatchKey, MatchingStats, QuoteRow, TicketRow,
};
use sqlx::PgPool;

/// 查询全部工单
pub async fn list_tickets(pool: &PgPool) -> Result<Vec<TicketRow>, sqlx::Error> {
    sqlx::query_as::<_, TicketRow>(
        r#"
        SELECT id, external_id, reference, description, amount, ticket_date, contact_name
        FROM tickets
        ORDER BY id
        "#
    )
    .fetch_all(pool)
    .await
}

/// 查询全部报价单
pub async fn list_quotes(pool: &PgPool) -> Result<Vec<QuoteRow>, sqlx::Error> {
    sqlx::query_as::<_, QuoteRow>(
        r#"
        SELECT id, quote_number, contact_name, amount, issue_date
        FROM quotes
        ORDER BY id
        "#
    )
    .fetch_all(pool)
    .await
}

/// 查询全部发票
pub async fn list_invoices(pool: &PgPool) -> Result<Vec<InvoiceRow>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceRow>(
        r#"
        SELECT id, invoice_number, contact_name, amount, issue_date
        FROM invoices
        ORDER BY id
        "#
    )
    .fetch_all(pool)
    .await
}

/// 按 id 查询工单
pub async fn find_ticket(pool: &PgPool, id: i64) -> Result<Option<TicketRow>, sqlx::Error> {
    sqlx::query_as::<_, TicketRow>(
        r#"
        SELECT id, external_id, reference, description, amount, ticket_date, contact_name
        FROM tickets
        WHERE id = $1
        "#
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_quote(pool: &PgPool, id: i64) -> Result<Option<QuoteRow>, sqlx::Error> {
    sqlx::query_as::<_, QuoteRow>(
        r#"
        SELECT id, quote_number, contact_name, amount, issue_date
        FROM quotes
        WHERE id = $1
        "#
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_invoice(pool: &PgPool, id: i64) -> Result<Option<InvoiceRow>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceRow>(
        r#"
        SELECT id, invoice_number, contact_name, amount, issue_date
        FROM invoices
        WHERE id = $1
        "#
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// 已确认三元组
pub async fn list_confirmed_keys(pool: &PgPool) -> Result<Vec<MatchKey>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT ticket_id, quote_id, invoice_id
        FROM confirmed_matches
        WHERE status = 'confirmed'
        "#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(ticket_id, quote_id, invoice_id)| MatchKey {
            ticket_id,
            quote_id,
            invoice_id,
        })
        .collect())
}

/// 检查三条记录是否存在, 返回 (工单, 报价, 发票)
pub async fn records_exist(
    pool: &PgPool,
    key: &MatchKey,
) -> Result<(bool, bool, bool), sqlx::Error> {
    sqlx::query_as::<_, (bool, bool, bool)>(
        r#"
        SELECT EXISTS (SELECT 1 FROM tickets WHERE id = $1),
               EXISTS (SELECT 1 FROM quotes WHERE id = $2),
               EXISTS (SELECT 1 FROM invoices WHERE id = $3)
        "#
    )
    .bind(key.ticket_id)
    .bind(key.quote_id)
    .bind(key.invoice_id)
    .fetch_one(pool)
    .await
}

/// 插入已确认匹配 (三元组唯一约束冲突由调用方处理)
pub async fn insert_confirmed_match(
    pool: &PgPool,
    candidate: &MatchCandidate,
) -> Result<ConfirmedMatchRow, sqlx::Error> {
    let start_time = std::time::Instant::now();

    let insert = sqlx::query_as::<_, ConfirmedMatchRow>(
        r#"
        INSERT INTO confirmed_matches (
            ticket_id, quote_id, invoice_id,
            match_score, confidence, match_reasons,
            status, confirmed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, 'confirmed', now())
        RETURNING id, ticket_id, quote_id, invoice_id,
                  match_score, confidence, match_reasons,
                  status, confirmed_at
        "#
    )
    .bind(candidate.ticket_id)
    .bind(candidate.quote_id)
    .bind(candidate.invoice_id)
    .bind(candidate.match_score)
    .bind(candidate.confidence.as_str())
    .bind(&candidate.match_reasons)
    .fetch_one(pool);

    // 超时控制: 30秒
    match tokio::time::timeout(std::time::Duration::from_secs(30), insert).await {
        Ok(Ok(row)) => {
            tracing::info!("✓ INSERT confirmed_matches id={}, 耗时: {:?}", row.id, start_time.elapsed());
            Ok(row)
        }
        Ok(Err(e)) => {
            tracing::debug!("✗ INSERT confirmed_matches 失败, 耗时: {:?}, 错误: {:?}", start_time.elapsed(), e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("✗ INSERT confirmed_matches 超时 (>30秒)!");
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// 统计: 三类记录总数 + 已确认匹配的分档数与平均分
pub async fn matching_stats(pool: &PgPool) -> Result<MatchingStats, sqlx::Error> {
    sqlx::query_as::<_, MatchingStats>(
        r#"
        SELECT (SELECT count(*) FROM tickets) AS total_tickets,
               (SELECT count(*) FROM quotes) AS total_quotes,
               (SELECT count(*) FROM invoices) AS total_invoices,
               count(*) AS total_matches,
               count(*) FILTER (WHERE confidence = 'high') AS high_confidence_matches,
               count(*) FILTER (WHERE confidence = 'medium') AS medium_confidence_matches,
               count(*) FILTER (WHERE confidence = 'low') AS low_confidence_matches,
               coalesce(avg(match_score), 0)::float8 AS avg_match_score
        FROM confirmed_matches
        WHERE status = 'confirmed'
        "#
    )
    .fetch_one(pool)
    .await
}
