use crate::fetch::PageFetcher;
use crate::models::{Agency, ListingRef, RawApartment};
use crate::pipeline::ApartmentSource;
use crate::{cpm_scraper, jsm_scraper};
use anyhow::Result;

const CPM_DESCRIPTION: &str = "Campus Property Management was founded in 1967 by Champaign resident and University of Illinois alumnus Erwin Goldfarb. Recognizing the need for expanded housing around the University, Erwin decided to start his own leasing company. Starting off with just one building, Erwin took pride in providing the best customer service to his tenants - even going so far as to lay carpet and painting apartments himself! Growing steadily through the years, the company built its first building from start to finish in 1983 and officially became Campus Property Management in 1988. Since those early years, CPM has grown to include 1,850 apartments which are home to 4,500 tenants each year! As our business continues to grow, we remain committed to our core values of integrity, commitment, innovation, opportunity and service. We are dedicated to providing comfortable and affordable housing with great customer service while continuing to be a proud part of the Illini community and giving back whenever we can!";

const JSM_DESCRIPTION: &str = "Established in 1974, JSM is a family-owned provider of quality apartments. We offer a variety of units from studios to five bedrooms with every location benefitting from our award winning amenities, responsive 24 hour maintenance, and friendly property management staff. JSM Development began in Champaign, IL, and manages roughly 1,500 apartments and 450,000 sq/ft of commercial space. JSM has been a major contributor to the development of Campustown in Champaign and the East Campus area in Urbana at the University of Illinois. These popular locations are now home to major national retailers such as Urban Outfitters, Chipotle, Panera, Cold Stone Creamery, and Noodles & Co.";

pub struct CpmSource;

impl ApartmentSource for CpmSource {
    fn name(&self) -> &str {
        "CPM"
    }

    fn agency(&self) -> Agency {
        Agency {
            name: "CPM",
            base_url: "http://www.cpm-apts.com/",
            description: CPM_DESCRIPTION,
        }
    }

    fn discover_urls(&self, fetcher: &PageFetcher) -> Result<Vec<ListingRef>> {
        cpm_scraper::discover(fetcher)
    }

    fn extract(&self, fetcher: &PageFetcher, listing: &ListingRef) -> Result<Vec<RawApartment>> {
        cpm_scraper::extract(fetcher, listing)
    }
}

pub struct JsmSource;

impl ApartmentSource for JsmSource {
    fn name(&self) -> &str {
        "JSM"
    }

    fn agency(&self) -> Agency {
        Agency {
            name: "JSM",
            base_url: "https://apartments.jsmliving.com/",
            description: JSM_DESCRIPTION,
        }
    }

    fn discover_urls(&self, fetcher: &PageFetcher) -> Result<Vec<ListingRef>> {
        jsm_scraper::discover(fetcher)
    }

    fn extract(&self, fetcher: &PageFetcher, listing: &ListingRef) -> Result<Vec<RawApartment>> {
        jsm_scraper::extract(fetcher, listing)
    }
}
