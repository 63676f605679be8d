//! Prompt 构建：从数据上下文与上游负载到有界文本的纯函数
//!
//! 模板逻辑与后端调用完全分离，可独立测试；所有输出有界（truncate），
//! 相同输入必然产出相同 Prompt。

use crate::data::DatasetContext;

/// 单段上下文文本的字符上限
pub const SECTION_LIMIT: usize = 6000;

/// 按字符边界截断，超出以省略标记收尾
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}\n[...truncated]", cut)
}

/// 数据集关键事实（分析、问答共用的确定性摘要）
pub fn dataset_overview(ctx: &DatasetContext) -> String {
    let mut lines = vec![
        "Key Metrics:".to_string(),
        format!("- Total Revenue: ${:.2}", ctx.total_revenue),
        format!("- Total Expenses: ${:.2}", ctx.total_cost),
        format!("- Total Profit: ${:.2}", ctx.profit),
        format!("- Profit Margin: {:.2}%", ctx.profit_margin),
    ];
    if let Some(avg) = ctx.avg_customers {
        lines.push(format!("- Average Customers per Period: {:.0}", avg));
    }
    lines.push(format!(
        "- Best Performing Period: {}",
        ctx.best_period.format("%B %Y")
    ));
    lines.push(format!("- Best Performing Product: {}", ctx.best_product));
    lines.push(format!("- Records Analyzed: {}", ctx.record_count));
    lines.join("\n")
}

/// 产品表现表（收入降序）
pub fn product_table(ctx: &DatasetContext) -> String {
    let mut lines = vec!["Product Performance (revenue desc):".to_string()];
    for p in &ctx.product_ranking {
        lines.push(format!(
            "- {}: revenue ${:.2}, expenses ${:.2}, profit ${:.2}",
            p.product, p.revenue, p.cost, p.profit
        ));
    }
    lines.join("\n")
}

/// 趋势序列（期间升序，月名呈现）
pub fn trend_table(ctx: &DatasetContext) -> String {
    let mut lines = vec!["Period Trends (ascending):".to_string()];
    for p in &ctx.trend {
        lines.push(format!(
            "- {}: revenue ${:.2}, profit ${:.2}",
            p.period.format("%B %Y"),
            p.revenue,
            p.profit
        ));
    }
    lines.join("\n")
}

pub fn analyst_instruction() -> String {
    "As a Data Analyst Agent, analyze this company sales data and provide insights.\n\
     Cover: 1. Revenue and profit trends 2. Product performance comparison \
     3. Customer acquisition patterns 4. Seasonal trends 5. Areas of concern or opportunity.\n\
     Include specific numbers and calculations in your analysis. \
     If some aspect has no supporting data, say so briefly instead of inventing figures."
        .to_string()
}

pub fn analyst_context(ctx: &DatasetContext) -> String {
    truncate(
        &format!(
            "{}\n\n{}\n\n{}",
            dataset_overview(ctx),
            product_table(ctx),
            trend_table(ctx)
        ),
        SECTION_LIMIT,
    )
}

pub fn summarizer_instruction() -> String {
    "As a Summarizer Agent, take this detailed analysis and create exactly 4-5 clear, \
     concise bullet points. Make them simple, clear, and actionable for business \
     decision-making. Output one bullet per line, starting with '- '."
        .to_string()
}

pub fn summarizer_context(ctx: &DatasetContext, analysis: &str) -> String {
    truncate(
        &format!(
            "{}\n\nDetailed Insights:\n{}",
            dataset_overview(ctx),
            analysis
        ),
        SECTION_LIMIT,
    )
}

pub fn strategy_instruction() -> String {
    "As a Business Strategy Agent, based on this analysis, recommend practical strategies for: \
     1. Increasing sales revenue 2. Reducing operational costs 3. Growing customer base \
     4. Improving profit margins 5. Seasonal optimization.\n\
     Make each recommendation practical and implementable with clear next steps. \
     Output one recommendation per line, starting with '- '."
        .to_string()
}

pub fn strategy_context(ctx: &DatasetContext, analysis: &str) -> String {
    truncate(
        &format!(
            "{}\n\nAnalysis Insights:\n{}",
            dataset_overview(ctx),
            analysis
        ),
        SECTION_LIMIT,
    )
}

pub fn reporter_instruction(current_date: &str) -> String {
    format!(
        "As an Email Reporter Agent, create a professional email for the company boss \
         summarizing monthly performance. Include: a professional greeting, an executive \
         summary of performance, key insights (3-4 main points), strategic recommendations \
         (2-3 top priorities), and a professional closing.\n\
         Start your output with a line 'Subject: ...'.\n\
         Date: {}. Make it concise but comprehensive, suitable for a busy executive.",
        current_date
    )
}

pub fn reporter_context(summary: &str, strategy: &str) -> String {
    truncate(
        &format!(
            "Key Insights Summary:\n{}\n\nStrategic Recommendations:\n{}",
            summary, strategy
        ),
        SECTION_LIMIT,
    )
}

pub fn support_instruction() -> String {
    "As a friendly Customer Support Agent, answer this question about our company sales data. \
     Provide a friendly, accurate, and helpful response. Include specific numbers when relevant. \
     If the question can't be answered with the available data, politely explain what \
     information is available."
        .to_string()
}
