#[cfg(test)]
mod tests {
    use crate::api::http::client_with_timeout;
    use crate::api::ExchangeRateFetcher;
    use crate::error::{AppError, Result};
    use crate::models::{ExchangeRateQuery, RateDate};
    use chrono::NaiveDate;
    use mockito::{Mock, ServerGuard};
    use reqwest::Client;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::net::TcpListener;

    // Root path the mock CDN is served under; the fetcher appends `@<version>`
    const ROOT_PATH: &str = "/gh/fawazahmed0/currency-api";

    fn fetcher_for(server: &ServerGuard) -> ExchangeRateFetcher {
        ExchangeRateFetcher::with_client(Client::new(), &format!("{}{}", server.url(), ROOT_PATH))
    }

    fn day(s: &str) -> RateDate {
        RateDate::On(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    // Helper to create a plausible all-currency payload for one date
    fn all_currency_payload(date: &str, eur: f64) -> Value {
        json!({
            "date": date,
            "usd": { "eur": eur, "gbp": 0.78, "jpy": 141.2, "usd": 1 }
        })
    }

    async fn mock_resource(
        server: &mut ServerGuard,
        path: &str,
        status: usize,
        body: &str,
        hits: usize,
    ) -> Mock {
        server
            .mock("GET", format!("{}{}", ROOT_PATH, path).as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_fetch_rates_single_date() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let payload = all_currency_payload("2024-01-01", 0.905);
        let m = mock_resource(
            &mut server,
            "@1/2024-01-01/currencies/usd.json",
            200,
            &payload.to_string(),
            1,
        )
        .await;

        let query = ExchangeRateQuery::new(vec![day("2024-01-01")], "usd");
        let rates = fetcher_for(&server).fetch_rates(&query).await?;

        assert_eq!(rates.len(), 1);
        assert_eq!(rates.get(&day("2024-01-01")), Some(&payload));
        m.assert_async().await;

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_rates_two_dates_keyed_by_date() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let p1 = all_currency_payload("2024-01-01", 0.905);
        let p2 = all_currency_payload("2024-01-02", 0.911);
        let _m1 = mock_resource(
            &mut server,
            "@1/2024-01-01/currencies/usd.json",
            200,
            &p1.to_string(),
            1,
        )
        .await;
        let _m2 = mock_resource(
            &mut server,
            "@1/2024-01-02/currencies/usd.json",
            200,
            &p2.to_string(),
            1,
        )
        .await;

        let query = ExchangeRateQuery::new(vec![day("2024-01-01"), day("2024-01-02")], "usd");
        let rates = fetcher_for(&server).fetch_rates(&query).await?;

        let rendered = serde_json::to_value(&rates).unwrap();
        assert_eq!(rendered, json!({ "2024-01-01": p1, "2024-01-02": p2 }));

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_rates_order_independent() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dates = ["2024-01-03", "2024-01-01", "2024-01-02"];
        let mut mocks = Vec::new();
        for (i, d) in dates.iter().enumerate() {
            let body = all_currency_payload(d, 0.9 + i as f64 / 100.0).to_string();
            let path = format!("@1/{}/currencies/usd.json", d);
            mocks.push(mock_resource(&mut server, &path, 200, &body, 2).await);
        }

        let fetcher = fetcher_for(&server);
        let forward: Vec<RateDate> = dates.iter().map(|d| day(d)).collect();
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = fetcher
            .fetch_rates(&ExchangeRateQuery::new(forward, "usd"))
            .await?;
        let b = fetcher
            .fetch_rates(&ExchangeRateQuery::new(reversed, "usd"))
            .await?;

        assert_eq!(a.len(), 3);
        assert_eq!(a, b);
        for m in mocks {
            m.assert_async().await;
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_rates_duplicate_dates_fetched_once() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let m = mock_resource(
            &mut server,
            "@1/2024-01-01/currencies/usd.json",
            200,
            &all_currency_payload("2024-01-01", 0.9).to_string(),
            1,
        )
        .await;

        let query = ExchangeRateQuery::new(vec![day("2024-01-01"), day("2024-01-01")], "USD");
        let rates = fetcher_for(&server).fetch_rates(&query).await?;

        assert_eq!(rates.len(), 1);
        m.assert_async().await;

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_rates_with_target_returns_scalar_payload() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_resource(
            &mut server,
            "@1/latest/currencies/usd/eur.json",
            200,
            r#"{"date":"2024-01-05","eur":0.913}"#,
            1,
        )
        .await;

        let query = ExchangeRateQuery::latest("usd").with_target("EUR");
        let rates = fetcher_for(&server).fetch_rates(&query).await?;

        assert_eq!(rates[&RateDate::Latest]["eur"], json!(0.913));

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_rates_falls_back_to_minified_on_status() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let primary = mock_resource(
            &mut server,
            "@1/2024-01-01/currencies/usd.json",
            404,
            "",
            1,
        )
        .await;
        let payload = all_currency_payload("2024-01-01", 0.905);
        let fallback = mock_resource(
            &mut server,
            "@1/2024-01-01/currencies/usd.min.json",
            200,
            &payload.to_string(),
            1,
        )
        .await;

        let query = ExchangeRateQuery::new(vec![day("2024-01-01")], "usd");
        let rates = fetcher_for(&server).fetch_rates(&query).await?;

        assert_eq!(rates[&day("2024-01-01")], payload);
        primary.assert_async().await;
        fallback.assert_async().await;

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_rates_both_resources_fail() {
        let mut server = mockito::Server::new_async().await;
        let _p = mock_resource(
            &mut server,
            "@1/2024-01-01/currencies/usd.json",
            500,
            "",
            1,
        )
        .await;
        let _f = mock_resource(
            &mut server,
            "@1/2024-01-01/currencies/usd.min.json",
            404,
            "",
            1,
        )
        .await;

        let query = ExchangeRateQuery::new(vec![day("2024-01-01")], "usd");
        let result = fetcher_for(&server).fetch_rates(&query).await;

        match result {
            Err(AppError::FallbackExhausted { primary, fallback }) => {
                assert!(primary.url().unwrap().ends_with("usd.json"));
                assert!(fallback.url().unwrap().ends_with("usd.min.json"));
                assert!(matches!(*primary, AppError::HttpStatus { .. }));
                assert!(matches!(*fallback, AppError::HttpStatus { .. }));
            },
            other => panic!("Expected FallbackExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_rates_one_bad_date_aborts_batch() {
        let mut server = mockito::Server::new_async().await;
        let _ok = mock_resource(
            &mut server,
            "@1/2024-01-01/currencies/usd.json",
            200,
            &all_currency_payload("2024-01-01", 0.9).to_string(),
            1,
        )
        .await;
        // Nothing is mocked for 2024-01-02, so both of its resources answer 501

        let query = ExchangeRateQuery::new(vec![day("2024-01-01"), day("2024-01-02")], "usd");
        let result = fetcher_for(&server).fetch_rates(&query).await;

        assert!(matches!(result, Err(AppError::FallbackExhausted { .. })));
    }

    #[tokio::test]
    async fn test_fetch_rates_settled_reports_per_date() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let payload = all_currency_payload("2024-01-01", 0.9);
        let _ok = mock_resource(
            &mut server,
            "@1/2024-01-01/currencies/usd.json",
            200,
            &payload.to_string(),
            1,
        )
        .await;

        let query = ExchangeRateQuery::new(vec![day("2024-01-01"), day("2024-01-02")], "usd");
        let settled = fetcher_for(&server).fetch_rates_settled(&query).await?;

        assert_eq!(settled.len(), 2);
        assert_eq!(settled[&day("2024-01-01")].as_ref().ok(), Some(&payload));
        assert!(settled[&day("2024-01-02")].is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_rates_invalid_query() {
        let server = mockito::Server::new_async().await;
        let query = ExchangeRateQuery::new(Vec::<RateDate>::new(), "usd");
        let result = fetcher_for(&server).fetch_rates(&query).await;
        assert!(matches!(result, Err(AppError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_fetch_currency_codes_with_fallback() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _p = mock_resource(&mut server, "@1/latest/currencies.json", 503, "", 1).await;
        let _f = mock_resource(
            &mut server,
            "@1/latest/currencies.min.json",
            200,
            r#"{"eur":"Euro","usd":"US Dollar"}"#,
            1,
        )
        .await;

        let codes = fetcher_for(&server).fetch_currency_codes().await?;

        assert_eq!(codes["usd"], "US Dollar");
        assert_eq!(codes.as_object().map(|m| m.len()), Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_currency_codes_times_out_on_silent_server() {
        // The listener accepts connections but never answers either resource
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = client_with_timeout(Duration::from_millis(200)).unwrap();
        let fetcher =
            ExchangeRateFetcher::with_client(client, &format!("http://{}{}", addr, ROOT_PATH));

        let result = tokio::time::timeout(Duration::from_secs(5), fetcher.fetch_currency_codes())
            .await
            .expect("fetch was not bounded by the client timeout");

        match result {
            Err(AppError::FallbackExhausted { primary, fallback }) => {
                for err in [primary, fallback] {
                    match *err {
                        AppError::Network { source, .. } => assert!(source.is_timeout()),
                        other => panic!("Expected Network timeout, got {:?}", other),
                    }
                }
            },
            other => panic!("Expected FallbackExhausted, got {:?}", other),
        }
    }

    #[cfg(feature = "integration-tests")]
    #[tokio::test]
    async fn test_live_latest_rates() -> Result<()> {
        let fetcher = ExchangeRateFetcher::new();
        let rates = fetcher
            .fetch_rates(&ExchangeRateQuery::latest("usd").with_target("eur"))
            .await?;
        assert!(rates.contains_key(&RateDate::Latest));
        Ok(())
    }
}
